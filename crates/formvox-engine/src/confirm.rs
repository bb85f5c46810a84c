//! Read-back confirmation before a candidate is committed.

use crate::command::{self, Command};
use crate::prompt;
use crate::session::{Effect, SessionState};
use formvox_types::SessionStatus;
use tracing::debug;

/// Holds an approved `candidate` as pending and asks the user to confirm it.
pub(crate) fn begin(state: &mut SessionState, candidate: String, fx: &mut Vec<Effect>) {
    state.interim.clear();
    state.error = None;
    state.status = SessionStatus::Confirming;
    state.pending = Some(candidate);
    speak_read_back(state, fx);
}

/// Resolves a final utterance heard while confirming.
pub(crate) fn resolve(state: &mut SessionState, utterance: &str, fx: &mut Vec<Effect>) {
    match command::recognize(utterance, true) {
        Command::Affirm => {
            state.close_capture(fx);
            match state.pending.take() {
                Some(value) => state.commit(value, fx),
                None => state.settle(),
            }
        }
        Command::Deny => {
            state.close_capture(fx);
            state.clear_transients();
            state.settle();
            state.ask(fx);
        }
        command => {
            debug!(?command, "waiting for yes or no");
            state.interim.clear();
        }
    }
}

/// The read-back finished playing; listen for the answer.
pub(crate) fn on_read_back_spoken(state: &mut SessionState, fx: &mut Vec<Effect>) {
    if !state.capturing && state.recognition_available {
        state.open_capture(fx);
    }
}

/// The user did not answer in time; ask again and keep the candidate.
pub(crate) fn repeat_read_back(state: &mut SessionState, fx: &mut Vec<Effect>) {
    debug!(index = state.index, "confirmation timed out, repeating read-back");
    speak_read_back(state, fx);
}

fn speak_read_back(state: &mut SessionState, fx: &mut Vec<Effect>) {
    let text = match (state.active_field(), state.pending.as_deref()) {
        (Some(field), Some(value)) => prompt::read_back(field, value),
        _ => return,
    };
    state.prompt = text;
    if state.config.speech_output {
        state.close_capture(fx);
        state.speak(state.prompt.clone(), fx);
    }
}
