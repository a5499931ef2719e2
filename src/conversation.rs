//! Conversation engine
//!
//! Each conversation runs on its own thread and talks to the host through two
//! zero-capacity channels. Every item sent on the output channel waits until
//! the host takes it, and every read of player text waits until the host
//! supplies it, so the engine never runs ahead of the screen or the player.
//! The engine checks the cancellation flag between items and while waiting
//! for input. A session parked on a send is released by `stop()`, which
//! takes and discards items until the session thread has gone.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::error::TalkError;
use crate::party::{Location, NpcId, PartyState};
use crate::script::{ScriptItem, ScriptLine, TalkCommand};
use crate::talk_script::{TalkScript, TalkSlot};

/// The NPC on the other side of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpcRef {
    pub id: NpcId,
    pub location: Location,
}

/// How the sections after the current one are treated during one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipInstruction {
    DontSkip,
    SkipNext,
    SkipAfterNext,
    AbortToLabel,
}

/// Text shown in place of an opcode the engine does not act on
fn placeholder(item: &ScriptItem) -> String {
    match item.command {
        TalkCommand::Unknown => format!("[{:#04x}]", item.num.unwrap_or(0)),
        command => format!("[{:?}]", command),
    }
}

/// A dialogue session with one NPC
pub struct Conversation<P: PartyState + Send + 'static> {
    npc: NpcRef,
    out: Receiver<ScriptItem>,
    input: SyncSender<String>,
    cancel: Arc<AtomicBool>,
    ended: Arc<AtomicBool>,
    poll: Duration,
    /// Engine state waiting for `start()`
    session: Option<Session<P>>,
    handle: Option<thread::JoinHandle<P>>,
}

impl<P: PartyState + Send + 'static> Conversation<P> {
    pub fn new(npc: NpcRef, party: P, script: Arc<TalkScript>) -> Self {
        Conversation::with_config(npc, party, script, EngineConfig::default())
    }

    pub fn with_config(
        npc: NpcRef,
        party: P,
        script: Arc<TalkScript>,
        config: EngineConfig,
    ) -> Self {
        let (out_tx, out_rx) = mpsc::sync_channel(0);
        let (in_tx, in_rx) = mpsc::sync_channel(0);
        let cancel = Arc::new(AtomicBool::new(false));
        let ended = Arc::new(AtomicBool::new(false));
        let poll = config.poll_interval();

        let session = Session {
            npc,
            party,
            script,
            config,
            out: out_tx,
            input: in_rx,
            cancel: Arc::clone(&cancel),
            ended: Arc::clone(&ended),
            rune_mode: false,
            convo_order: VecDeque::new(),
            skip: SkipInstruction::DontSkip,
            active_label: None,
        };

        Conversation {
            npc,
            out: out_rx,
            input: in_tx,
            cancel,
            ended,
            poll,
            session: Some(session),
            handle: None,
        }
    }

    /// Spawn the session thread
    pub fn start(&mut self) -> Result<(), TalkError> {
        let session = self.session.take().ok_or(TalkError::AlreadyStarted)?;
        info!(
            "Starting conversation with NPC {} at location {}",
            self.npc.id, self.npc.location
        );
        let handle = thread::Builder::new()
            .name(format!("talk-npc-{}", self.npc.id))
            .spawn(move || session.run())?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Cancel the session and wait for its output channel to close.
    ///
    /// Items the session was still handing over are discarded, so the host
    /// sees nothing more on `out()` once this returns.
    pub fn stop(&self) {
        if !self.cancel.swap(true, Ordering::SeqCst) {
            info!("Stop requested for conversation with NPC {}", self.npc.id);
        }
        if self.handle.is_none() {
            return;
        }
        loop {
            match self.out.recv_timeout(self.poll) {
                Ok(item) => trace!("Discarding {} after stop", item),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Items for the host to render, closed when the session is over
    pub fn out(&self) -> &Receiver<ScriptItem> {
        &self.out
    }

    /// Sender for player text
    pub fn input(&self) -> SyncSender<String> {
        self.input.clone()
    }

    pub fn npc(&self) -> NpcRef {
        self.npc
    }

    /// True once the NPC has ended the encounter
    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the session thread and take back the party state.
    ///
    /// Blocks until the session is over, so call `stop()` first unless the
    /// conversation has already ended.
    pub fn join(mut self) -> Result<P, TalkError> {
        if let Some(session) = self.session.take() {
            return Ok(session.party);
        }
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| TalkError::SessionPanicked),
            None => Err(TalkError::SessionPanicked),
        }
    }
}

impl<P: PartyState + Send + 'static> Drop for Conversation<P> {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

/// Engine state, owned by the session thread
struct Session<P> {
    npc: NpcRef,
    party: P,
    script: Arc<TalkScript>,
    config: EngineConfig,
    out: SyncSender<ScriptItem>,
    input: Receiver<String>,
    cancel: Arc<AtomicBool>,
    ended: Arc<AtomicBool>,
    rune_mode: bool,
    /// Line indices still to be played before asking the player
    convo_order: VecDeque<usize>,
    skip: SkipInstruction,
    /// Label whose questions take the next player reply
    active_label: Option<u8>,
}

impl<P: PartyState> Session<P> {
    /// Thread body; the output sender is dropped on return
    fn run(mut self) -> P {
        match self.talk() {
            Ok(()) => debug!("Conversation with NPC {} finished", self.npc.id),
            Err(TalkError::Cancelled) => {
                info!("Conversation with NPC {} cancelled", self.npc.id)
            }
            Err(e) => warn!("Conversation with NPC {} stopped: {}", self.npc.id, e),
        }
        self.party
    }

    fn talk(&mut self) -> Result<(), TalkError> {
        self.convo_order.push_back(TalkSlot::Description.index());
        self.convo_order.push_back(TalkSlot::Greeting.index());

        while !self.is_ended() {
            self.check_cancelled()?;

            if let Some(index) = self.convo_order.pop_front() {
                self.play_line(index)?;
                continue;
            }

            let input = self.await_input()?;
            self.respond(&input)?;
        }

        Ok(())
    }

    /// Play a line by index: a fixed slot or a label definition
    fn play_line(&mut self, index: usize) -> Result<(), TalkError> {
        let script = Arc::clone(&self.script);
        let Some(line) = script.line(index) else {
            return self.missing_line(index);
        };
        debug!("Playing line {}", index);

        if index == TalkSlot::Description.index() {
            let prefix = self.config.messages.description_prefix.clone();
            self.emit(ScriptItem::text(prefix))?;
        }

        match line.label_definition() {
            Some((number, _)) => {
                if script.label(number).is_some_and(|l| l.awaits_reply()) {
                    self.active_label = Some(number);
                }
                self.process_line(&line.label_body())
            }
            None => self.process_line(line),
        }
    }

    /// Answer one piece of player text
    fn respond(&mut self, input: &str) -> Result<(), TalkError> {
        let trimmed = input.trim();
        let keyword = if trimmed.is_empty() { "bye" } else { trimmed };
        let is_bye = keyword.eq_ignore_ascii_case("bye");
        debug!("Player says '{}'", keyword);

        let script = Arc::clone(&self.script);

        if let Some(label) = self.active_label.take().and_then(|n| script.label(n)) {
            if let Some(answer) = label.answer(keyword) {
                return self.process_line(answer);
            }
            if let Some(default) = label.default_answers.first().filter(|_| !is_bye) {
                return self.process_line(default);
            }
        }

        match script.answer(keyword) {
            Some(answer) => self.process_line(answer),
            None if is_bye => {
                let farewell = self.config.messages.farewell.clone();
                self.emit(ScriptItem::text(farewell))?;
                self.end();
                Ok(())
            }
            None => {
                let text = self.config.messages.cannot_help.clone();
                self.emit(ScriptItem::text(text))
            }
        }
    }

    /// Play all sections of a line; the skip instruction never outlives it
    fn process_line(&mut self, line: &ScriptLine) -> Result<(), TalkError> {
        let sections = line.split_into_sections();
        let result = self.run_sections(&sections);
        self.skip = SkipInstruction::DontSkip;
        result
    }

    fn run_sections(&mut self, sections: &[ScriptLine]) -> Result<(), TalkError> {
        for (i, section) in sections.iter().enumerate() {
            if self.is_ended() {
                break;
            }

            match self.skip {
                SkipInstruction::SkipNext => {
                    trace!("Skipping section {}", i);
                    self.skip = SkipInstruction::DontSkip;
                    continue;
                }
                SkipInstruction::SkipAfterNext => self.skip = SkipInstruction::SkipNext,
                SkipInstruction::AbortToLabel => break,
                SkipInstruction::DontSkip => {}
            }

            if section.mentions_avatar_name() && !self.party.has_met(self.npc.id) {
                trace!("Section {} names the Avatar before meeting, skipped", i);
                continue;
            }

            self.execute_section(section)?;

            if self.skip == SkipInstruction::AbortToLabel {
                break;
            }
        }
        Ok(())
    }

    fn execute_section(&mut self, section: &ScriptLine) -> Result<(), TalkError> {
        for item in section.items() {
            match item.command {
                TalkCommand::IfElseKnowsName => {
                    self.skip = if self.party.has_met(self.npc.id) {
                        SkipInstruction::SkipAfterNext
                    } else {
                        SkipInstruction::SkipNext
                    };
                    return Ok(());
                }
                TalkCommand::AvatarsName => {
                    let name = self.party.avatar_name();
                    self.emit(ScriptItem::text(name))?;
                }
                TalkCommand::AskName => self.ask_name()?,
                TalkCommand::DefineLabel | TalkCommand::GotoLabel => {
                    match item.line {
                        Some(target) => {
                            debug!("Jump to label {:?} at line {}", item.num, target);
                            self.convo_order.push_back(target);
                            self.skip = SkipInstruction::AbortToLabel;
                        }
                        None => {
                            warn!("Unresolved label jump {}", item);
                            self.emit(ScriptItem::text(format!(
                                "[unresolved label {}]",
                                item.num.unwrap_or(0)
                            )))?;
                            self.end();
                        }
                    }
                    return Ok(());
                }
                TalkCommand::JoinParty => {
                    self.join_party()?;
                    return Ok(());
                }
                TalkCommand::EndConversation => {
                    let farewell = self.config.messages.farewell.clone();
                    self.emit(ScriptItem::text(farewell))?;
                    self.end();
                    return Ok(());
                }
                TalkCommand::PlainString | TalkCommand::NewLine | TalkCommand::KeyWait => {
                    self.emit(item.clone())?
                }
                TalkCommand::Rune => {
                    self.rune_mode = !self.rune_mode;
                    trace!("Rune mode {}", self.rune_mode);
                    self.emit(item.clone())?;
                }
                TalkCommand::Pause => self.pause()?,
                TalkCommand::KarmaPlusOne => self.party.adjust_karma(1),
                TalkCommand::KarmaMinusOne => self.party.adjust_karma(-1),
                TalkCommand::Label1
                | TalkCommand::Label2
                | TalkCommand::Label3
                | TalkCommand::Label4
                | TalkCommand::Label5
                | TalkCommand::Label6
                | TalkCommand::Label7
                | TalkCommand::Label8
                | TalkCommand::Label9
                | TalkCommand::Label10 => self.emit(ScriptItem::text(item.text_str()))?,
                TalkCommand::Gold
                | TalkCommand::Change
                | TalkCommand::CallGuards
                | TalkCommand::Unknown => {
                    debug!("No handler for {}", item);
                    self.emit(ScriptItem::text(placeholder(item)))?;
                }
                TalkCommand::Or
                | TalkCommand::StartNewSection
                | TalkCommand::DoNothingSection
                | TalkCommand::StartLabelDefinition
                | TalkCommand::EndScript => panic!(
                    "structural marker {:?} reached execution in NPC {} script",
                    item.command, self.npc.id
                ),
            }
        }
        Ok(())
    }

    fn ask_name(&mut self) -> Result<(), TalkError> {
        self.emit(ScriptItem::command(TalkCommand::AskName))?;
        let answer = self.await_input()?;
        let avatar = self.party.avatar_name();

        let reply = if answer.trim().eq_ignore_ascii_case(avatar.trim()) {
            self.party.set_met(self.npc.location, self.npc.id);
            self.config.messages.name_acknowledged.clone()
        } else {
            debug!("Player gave name '{}', not '{}'", answer.trim(), avatar);
            self.config.messages.name_doubted.clone()
        };
        self.emit(ScriptItem::text(reply))
    }

    /// Either outcome ends the encounter
    fn join_party(&mut self) -> Result<(), TalkError> {
        let reply = if !self.party.has_room() {
            self.config.messages.no_room.clone()
        } else {
            match self.party.join_npc(self.npc.id) {
                Ok(()) => {
                    info!("NPC {} joined the party", self.npc.id);
                    self.config.messages.joined.clone()
                }
                Err(e) => {
                    warn!("NPC {} could not join: {}", self.npc.id, e);
                    e
                }
            }
        };
        self.emit(ScriptItem::text(reply))?;
        self.end();
        Ok(())
    }

    fn missing_line(&mut self, index: usize) -> Result<(), TalkError> {
        warn!("NPC {} script has no line {}", self.npc.id, index);
        let text = self.config.messages.missing_line(index);
        self.emit(ScriptItem::text(text))?;
        self.end();
        Ok(())
    }

    /// Hand one item to the host, parked until it is taken
    fn emit(&self, item: ScriptItem) -> Result<(), TalkError> {
        self.check_cancelled()?;
        trace!("Emit {}", item);
        self.out.send(item).map_err(|_| TalkError::Disconnected)?;
        self.check_cancelled()
    }

    /// Wait for the next piece of player text
    fn await_input(&self) -> Result<String, TalkError> {
        loop {
            self.check_cancelled()?;
            match self.input.recv_timeout(self.config.poll_interval()) {
                Ok(text) => return Ok(text),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(TalkError::Disconnected),
            }
        }
    }

    fn pause(&self) -> Result<(), TalkError> {
        let deadline = Instant::now() + self.config.pause();
        loop {
            self.check_cancelled()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep((deadline - now).min(self.config.poll_interval()));
        }
    }

    fn end(&self) {
        if !self.ended.swap(true, Ordering::SeqCst) {
            info!("Conversation with NPC {} ended", self.npc.id);
        }
    }

    fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    fn check_cancelled(&self) -> Result<(), TalkError> {
        if self.cancel.load(Ordering::SeqCst) {
            Err(TalkError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "conversation_tests.rs"]
mod tests;
