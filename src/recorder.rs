//! Recorder contract and two reference recorders.
//!
//! The recorder owns the layout and persistence of the exploration log. The
//! engine offers it each recorded decision exactly once, inline on the calling
//! thread; implementations must tolerate concurrent calls.

use std::fmt::{self, Display, Write as _};
use std::sync::{Arc, Mutex};

use crate::{Action, ExplorerState, PolicyState, RecordError, Ranking};

/// One decision as offered to a recorder.
#[derive(Debug)]
pub struct Interaction<'a, C, O> {
    pub context: &'a C,
    pub value: &'a O,
    pub explorer_state: &'a ExplorerState,
    pub policy_state: Option<&'a PolicyState>,
    pub unique_key: &'a str,
}

impl<C, O> Interaction<'_, C, O> {
    #[must_use]
    pub fn probability(&self) -> f32 {
        self.explorer_state.probability()
    }
}

/// Receives recorded decisions.
pub trait Recorder<C, O>: Send + Sync {
    fn record(&self, interaction: &Interaction<'_, C, O>) -> Result<(), RecordError>;

    /// Called when the owning engine is torn down.
    fn flush(&self) -> Result<(), RecordError> {
        Ok(())
    }
}

impl<C, O, R> Recorder<C, O> for Arc<R>
where
    R: Recorder<C, O> + ?Sized,
{
    fn record(&self, interaction: &Interaction<'_, C, O>) -> Result<(), RecordError> {
        (**self).record(interaction)
    }

    fn flush(&self) -> Result<(), RecordError> {
        (**self).flush()
    }
}

/// Formatting of served values in the string log.
pub trait ActionDisplay {
    fn fmt_actions(&self, out: &mut String) -> fmt::Result;
}

impl ActionDisplay for Action {
    fn fmt_actions(&self, out: &mut String) -> fmt::Result {
        write!(out, "{self}")
    }
}

impl ActionDisplay for Ranking {
    fn fmt_actions(&self, out: &mut String) -> fmt::Result {
        for (i, a) in self.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write!(out, "{a}")?;
        }
        Ok(())
    }
}

/// Serializes each decision as one line:
///
/// ```text
/// <action> <unique_key> <probability:5 decimals> | <context>
/// ```
#[derive(Debug, Default)]
pub struct StringRecorder {
    buf: Mutex<String>,
}

impl StringRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current recording; `flush` clears the buffer.
    pub fn recording(&self, flush: bool) -> Result<String, RecordError> {
        let mut buf = self.buf.lock().map_err(|_| RecordError::LockPoisoned)?;
        if flush {
            Ok(std::mem::take(&mut *buf))
        } else {
            Ok(buf.clone())
        }
    }
}

/// Format one interaction in the string-recorder line format.
pub fn format_interaction<C, O>(interaction: &Interaction<'_, C, O>) -> Result<String, RecordError>
where
    C: Display,
    O: ActionDisplay,
{
    let mut line = String::new();
    let fmt_err = |_| RecordError::Rejected("formatting failed".to_string());
    interaction.value.fmt_actions(&mut line).map_err(fmt_err)?;
    write!(
        line,
        " {} {:.5} | {}",
        interaction.unique_key,
        interaction.probability(),
        interaction.context
    )
    .map_err(fmt_err)?;
    line.push('\n');
    Ok(line)
}

impl<C, O> Recorder<C, O> for StringRecorder
where
    C: Display,
    O: ActionDisplay,
{
    fn record(&self, interaction: &Interaction<'_, C, O>) -> Result<(), RecordError> {
        let line = format_interaction(interaction)?;
        self.buf
            .lock()
            .map_err(|_| RecordError::LockPoisoned)?
            .push_str(&line);
        Ok(())
    }
}

/// An owned copy of a recorded decision.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordedInteraction<C, O> {
    pub context: C,
    pub value: O,
    pub explorer_state: ExplorerState,
    pub policy_state: Option<PolicyState>,
    pub unique_key: String,
}

impl<C, O> RecordedInteraction<C, O> {
    #[must_use]
    pub fn probability(&self) -> f32 {
        self.explorer_state.probability()
    }
}

/// Keeps every recorded decision in memory.
#[derive(Debug)]
pub struct MemoryRecorder<C, O> {
    interactions: Mutex<Vec<RecordedInteraction<C, O>>>,
}

impl<C, O> Default for MemoryRecorder<C, O> {
    fn default() -> Self {
        Self {
            interactions: Mutex::new(Vec::new()),
        }
    }
}

impl<C: Clone, O: Clone> MemoryRecorder<C, O> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn interactions(&self) -> Vec<RecordedInteraction<C, O>> {
        match self.interactions.lock() {
            Ok(v) => v.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self.interactions.lock() {
            Ok(v) => v.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take and clear everything recorded so far.
    pub fn drain(&self) -> Vec<RecordedInteraction<C, O>> {
        match self.interactions.lock() {
            Ok(mut v) => std::mem::take(&mut *v),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl<C, O> Recorder<C, O> for MemoryRecorder<C, O>
where
    C: Clone + Send,
    O: Clone + Send,
{
    fn record(&self, interaction: &Interaction<'_, C, O>) -> Result<(), RecordError> {
        let owned = RecordedInteraction {
            context: interaction.context.clone(),
            value: interaction.value.clone(),
            explorer_state: *interaction.explorer_state,
            policy_state: interaction.policy_state.cloned(),
            unique_key: interaction.unique_key.to_string(),
        };
        self.interactions
            .lock()
            .map_err(|_| RecordError::LockPoisoned)?
            .push(owned);
        Ok(())
    }
}
