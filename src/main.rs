use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::execute;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use log::{debug, info};

use palaver::transcript::Transcript;
use palaver::{
    Conversation, EngineConfig, NpcRef, Party, ScriptItem, TalkFile, TalkScript, WordDict,
};

/// Party size used for the command line session
const PARTY_CAPACITY: usize = 6;

/// Extra quiet time after the last item before the prompt is shown
const PROMPT_DELAY: Duration = Duration::from_millis(200);

struct Options {
    tlk_path: String,
    words_path: String,
    npc: Option<u16>,
    avatar: String,
    location: u8,
    config_path: Option<String>,
    dump: bool,
}

fn usage(program: &str) {
    println!("palaver - talk to the people of Britannia");
    println!();
    println!(
        "Usage: {} <file.tlk> <words> <npc> [--avatar NAME] [--location N] [--config FILE] [--dump]",
        program
    );
    println!();
    println!("  <words>     word list, one per line or NUL separated");
    println!("  <npc>       NPC index from the TLK offset table");
    println!("  --dump      print the parsed script instead of talking (all NPCs if <npc> is omitted)");
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut positional = Vec::new();
    let mut avatar = "Avatar".to_string();
    let mut location = 0;
    let mut config_path = None;
    let mut dump = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--avatar" => {
                avatar = iter.next().ok_or("--avatar needs a name")?.clone();
            }
            "--location" => {
                let value = iter.next().ok_or("--location needs a number")?;
                location = value
                    .parse()
                    .map_err(|_| format!("Invalid location: {}", value))?;
            }
            "--config" => {
                config_path = Some(iter.next().ok_or("--config needs a file")?.clone());
            }
            "--dump" => dump = true,
            _ if arg.starts_with("--") => return Err(format!("Unknown option: {}", arg)),
            _ => positional.push(arg.clone()),
        }
    }

    if positional.len() < 2 {
        return Err("Missing TLK or word file".to_string());
    }
    let npc = match positional.get(2) {
        Some(value) => Some(
            value
                .parse()
                .map_err(|_| format!("Invalid NPC index: {}", value))?,
        ),
        None if dump => None,
        None => return Err("Missing NPC index".to_string()),
    };

    Ok(Options {
        tlk_path: positional[0].clone(),
        words_path: positional[1].clone(),
        npc,
        avatar,
        location,
        config_path,
        dump,
    })
}

fn load_words(path: &str) -> io::Result<WordDict> {
    let bytes = fs::read(path)?;
    let dict = if bytes.contains(&0) {
        WordDict::from_nul_separated(&bytes)
    } else {
        WordDict::from_lines(&String::from_utf8_lossy(&bytes))
    };
    debug!("Loaded {} words from {}", dict.len(), path);
    Ok(dict)
}

fn dump(file: &TalkFile, dict: &WordDict, npc: Option<u16>) {
    println!("{}", file);
    for (id, segment) in file.iter() {
        if npc.is_some_and(|n| n != id) {
            continue;
        }
        println!("=== NPC {} ===", id);
        println!("{}", TalkScript::parse(segment, dict));
    }
}

fn render(
    out: &mut impl Write,
    transcript: &mut Transcript,
    item: &ScriptItem,
    styled: bool,
) -> io::Result<()> {
    let Some(text) = transcript.push(item) else {
        return Ok(());
    };
    if styled && transcript.rune_mode() {
        execute!(out, SetForegroundColor(Color::Cyan), Print(text), ResetColor)?;
    } else {
        write!(out, "{}", text)?;
        out.flush()?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            usage(&args[0]);
            std::process::exit(1);
        }
    };

    let config = match &options.config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let dict = load_words(&options.words_path)?;
    let data = fs::read(&options.tlk_path)?;
    let file = TalkFile::parse(&data)?;
    info!("{} has {} NPC scripts", options.tlk_path, file.len());

    if options.dump {
        dump(&file, &dict, options.npc);
        return Ok(());
    }

    let Some(id) = options.npc else {
        return Err("Missing NPC index".into());
    };
    let Some(segment) = file.segment(id) else {
        return Err(format!("No script for NPC {} in {}", id, options.tlk_path).into());
    };

    let script = Arc::new(TalkScript::parse(segment, &dict));
    let idle = config.pause() + PROMPT_DELAY;
    let npc = NpcRef {
        id,
        location: options.location,
    };
    let mut convo = Conversation::with_config(
        npc,
        Party::new(&options.avatar, PARTY_CAPACITY),
        script,
        config,
    );
    convo.start()?;

    // Forward stdin lines; end of input says bye
    let input = convo.input();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if input.send(line).is_err() {
                        return;
                    }
                }
                Err(_) => break,
            }
        }
        let _ = input.send(String::new());
    });

    let styled = atty::is(atty::Stream::Stdout);
    let mut stdout = io::stdout();
    let mut transcript = Transcript::new();
    let mut prompted = false;
    loop {
        match convo.out().recv_timeout(idle) {
            Ok(item) => {
                render(&mut stdout, &mut transcript, &item, styled)?;
                prompted = false;
            }
            Err(RecvTimeoutError::Timeout) => {
                if !prompted {
                    write!(stdout, "\n> ")?;
                    stdout.flush()?;
                    prompted = true;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    writeln!(stdout)?;

    let party = convo.join()?;
    info!(
        "Conversation over; party members {:?}, karma {}",
        party.members(),
        party.karma()
    );
    Ok(())
}
