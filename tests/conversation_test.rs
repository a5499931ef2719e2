// Full conversations from TLK bytes to rendered transcript
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use palaver::script::TalkCommand;
use palaver::transcript::Transcript;
use palaver::{
    Conversation, EngineConfig, NpcRef, Party, PartyState, TalkFile, TalkScript, WordDict,
};
use test_log::test;

const IDLE: Duration = Duration::from_millis(250);

fn letters(text: &str) -> Vec<u8> {
    text.bytes().map(|b| b + 0x80).collect()
}

fn op(command: TalkCommand) -> u8 {
    command.as_byte().expect("opcode byte")
}

fn line(parts: &[&[u8]]) -> Vec<u8> {
    let mut bytes = parts.concat();
    bytes.push(0x00);
    bytes
}

/// A shopkeeper who asks the Avatar's name and can be recruited
fn shopkeeper_tlk() -> Vec<u8> {
    let segment = [
        line(&[&letters("Finn")]),
        line(&[&letters("a shopkeeper")]),
        line(&[
            &[op(TalkCommand::IfElseKnowsName)],
            &letters("Hello again, "),
            &[op(TalkCommand::AvatarsName)],
            &letters("!"),
            &[op(TalkCommand::StartNewSection)],
            &letters("Hello, stranger."),
        ]),
        line(&[&letters("I keep "), &[0x01], &letters(" shop.")]),
        line(&[&letters("Good day.")]),
        line(&[&letters("intro")]),
        line(&[&letters("Who art thou?"), &[op(TalkCommand::AskName)]]),
        line(&[&letters("join")]),
        line(&[&[op(TalkCommand::JoinParty)]]),
    ]
    .concat();

    let mut data = vec![0x01, 0x00, 0x05, 0x00, 0x06, 0x00];
    data.extend_from_slice(&segment);
    data
}

fn script() -> Arc<TalkScript> {
    let data = shopkeeper_tlk();
    let file = TalkFile::parse(&data).expect("TLK should parse");
    let dict = WordDict::from_lines("the\n");
    Arc::new(TalkScript::parse(file.segment(5).expect("NPC 5"), &dict))
}

fn config() -> EngineConfig {
    EngineConfig {
        pause_ms: 0,
        ..EngineConfig::default()
    }
}

/// Render until the engine wants input or closes; true if closed
fn drain(convo: &Conversation<Party>, transcript: &mut Transcript) -> bool {
    loop {
        match convo.out().recv_timeout(IDLE) {
            Ok(item) => {
                transcript.push(&item);
            }
            Err(RecvTimeoutError::Timeout) => return false,
            Err(RecvTimeoutError::Disconnected) => return true,
        }
    }
}

#[test]
fn test_introduce_then_recruit() {
    let npc = NpcRef { id: 5, location: 2 };
    let mut convo = Conversation::with_config(npc, Party::new("Avatar", 2), script(), config());
    convo.start().unwrap();

    let mut transcript = Transcript::new();
    assert!(!drain(&convo, &mut transcript));
    assert_eq!(transcript.text(), "You see a shopkeeperHello, stranger.");

    convo.input().send("job".to_string()).unwrap();
    drain(&convo, &mut transcript);
    assert!(transcript.text().ends_with("I keep the shop."));

    convo.input().send("intro".to_string()).unwrap();
    drain(&convo, &mut transcript);
    assert!(transcript.text().ends_with("Who art thou?\nWhat is thy name? "));

    convo.input().send("avatar".to_string()).unwrap();
    drain(&convo, &mut transcript);
    assert!(transcript.text().ends_with("A pleasure."));

    convo.input().send("join".to_string()).unwrap();
    assert!(drain(&convo, &mut transcript));
    assert!(transcript.text().ends_with("I am honoured to join thee!"));
    assert!(convo.has_ended());

    let party = convo.join().unwrap();
    assert!(party.has_met(5));
    assert_eq!(party.members(), &[5]);
}

#[test]
fn test_returning_avatar_is_greeted_by_name() {
    let npc = NpcRef { id: 5, location: 2 };
    let mut party = Party::new("Iolo", 2);
    party.set_met(2, 5);
    let mut convo = Conversation::with_config(npc, party, script(), config());
    convo.start().unwrap();

    let mut transcript = Transcript::new();
    drain(&convo, &mut transcript);
    assert_eq!(transcript.text(), "You see a shopkeeperHello again, Iolo!");

    convo.input().send("bye".to_string()).unwrap();
    assert!(drain(&convo, &mut transcript));
    assert!(transcript.text().ends_with("Good day.Farewell."));
}

#[test]
fn test_messages_from_config() {
    let config = EngineConfig::from_toml_str(
        r#"
        pause_ms = 0

        [messages]
        description_prefix = "Before thee stands "
        cannot_help = "Eh?"
        "#,
    )
    .unwrap();
    let npc = NpcRef { id: 5, location: 2 };
    let mut convo = Conversation::with_config(npc, Party::new("Avatar", 2), script(), config);
    convo.start().unwrap();

    let mut transcript = Transcript::new();
    drain(&convo, &mut transcript);
    assert!(transcript.text().starts_with("Before thee stands a shopkeeper"));

    convo.input().send("weather".to_string()).unwrap();
    drain(&convo, &mut transcript);
    assert!(transcript.text().ends_with("Eh?"));

    convo.stop();
    assert_eq!(
        convo.out().recv_timeout(Duration::from_secs(2)),
        Err(RecvTimeoutError::Disconnected)
    );
}
