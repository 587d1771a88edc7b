//! Asynchronous lifecycle hooks.
//!
//! Each hook owns an ordered list of taps. Running a hook awaits every tap in
//! registration order, one after the other, and stops at the first rejection.

use std::collections::HashMap;
use std::fmt;
use std::future::{self, Future};
use std::pin::Pin;
use std::rc::Rc;
use thiserror::Error;

/// Boxed future for single-threaded async work.
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Lifecycle hooks known to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    ImportBefore,
    ImportAfter,
    SaveBefore,
    SaveAfter,
}

impl HookName {
    /// Every hook, in the order the editor defines them.
    pub const ALL: [HookName; 4] = [
        HookName::ImportBefore,
        HookName::ImportAfter,
        HookName::SaveBefore,
        HookName::SaveAfter,
    ];

    /// Handler name used to build tap keys (`<plugin><method>`).
    pub fn method_name(self) -> &'static str {
        match self {
            HookName::ImportBefore => "hookImportBefore",
            HookName::ImportAfter => "hookImportAfter",
            HookName::SaveBefore => "hookSaveBefore",
            HookName::SaveAfter => "hookSaveAfter",
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Data handed to every tap of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum HookPayload {
    Empty,
    /// Serialized canvas document being imported.
    Document(String),
    /// Data URI produced by an export.
    Output(String),
}

/// Hook pipeline errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("hook {0} is not defined")]
    Undefined(HookName),
    #[error("tap {key} is already registered on {hook}")]
    DuplicateTap { hook: HookName, key: String },
    #[error("{hook} tap {tap} rejected: {reason}")]
    Rejected {
        hook: HookName,
        tap: String,
        reason: String,
    },
}

/// What a tap hands back: an immediate result or work still in flight.
pub enum HookOutcome {
    Ready(Result<(), String>),
    Deferred(LocalBoxFuture<'static, Result<(), String>>),
}

impl HookOutcome {
    pub fn done() -> Self {
        HookOutcome::Ready(Ok(()))
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        HookOutcome::Ready(Err(reason.into()))
    }

    pub fn deferred(work: impl Future<Output = Result<(), String>> + 'static) -> Self {
        HookOutcome::Deferred(Box::pin(work))
    }

    /// Normalize both variants into a future.
    pub fn into_future(self) -> LocalBoxFuture<'static, Result<(), String>> {
        match self {
            HookOutcome::Ready(result) => Box::pin(future::ready(result)),
            HookOutcome::Deferred(work) => work,
        }
    }
}

impl fmt::Debug for HookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookOutcome::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            HookOutcome::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Tap callback.
pub type TapFn = Rc<dyn Fn(&HookPayload) -> HookOutcome>;

#[derive(Clone)]
struct Tap {
    key: String,
    callback: TapFn,
}

/// Named series hooks.
#[derive(Default)]
pub struct HookPipeline {
    hooks: HashMap<HookName, Vec<Tap>>,
}

impl HookPipeline {
    /// Create an empty pipeline with no hooks defined.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline with every [`HookName`] defined.
    pub fn with_all_hooks() -> Self {
        let mut pipeline = Self::new();
        for hook in HookName::ALL {
            pipeline.define_hook(hook);
        }
        pipeline
    }

    /// Define a hook. Redefining keeps the existing taps.
    pub fn define_hook(&mut self, hook: HookName) {
        self.hooks.entry(hook).or_default();
    }

    pub fn is_defined(&self, hook: HookName) -> bool {
        self.hooks.contains_key(&hook)
    }

    /// Check that `key` could be tapped on `hook` without side effects.
    pub fn check_tap(&self, hook: HookName, key: &str) -> Result<(), HookError> {
        let taps = self.hooks.get(&hook).ok_or(HookError::Undefined(hook))?;
        if taps.iter().any(|tap| tap.key == key) {
            return Err(HookError::DuplicateTap {
                hook,
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Append a tap to `hook`.
    pub fn tap(&mut self, hook: HookName, key: impl Into<String>, callback: TapFn) -> Result<(), HookError> {
        let key = key.into();
        self.check_tap(hook, &key)?;
        log::debug!("tapping {} on {}", key, hook);
        self.hooks
            .entry(hook)
            .or_default()
            .push(Tap { key, callback });
        Ok(())
    }

    /// Remove the tap registered under `key`, keeping the order of the rest.
    pub fn untap(&mut self, hook: HookName, key: &str) -> bool {
        match self.hooks.get_mut(&hook) {
            Some(taps) => {
                let before = taps.len();
                taps.retain(|tap| tap.key != key);
                taps.len() != before
            }
            None => false,
        }
    }

    /// Tap keys of `hook` in run order.
    pub fn tap_keys(&self, hook: HookName) -> Vec<String> {
        self.hooks
            .get(&hook)
            .map(|taps| taps.iter().map(|tap| tap.key.clone()).collect())
            .unwrap_or_default()
    }

    /// Run every tap of `hook` in series.
    ///
    /// The tap list is captured when this is called; taps added while the
    /// run is in flight only take part in later runs.
    pub fn run(&self, hook: HookName, payload: HookPayload) -> LocalBoxFuture<'static, Result<(), HookError>> {
        let Some(taps) = self.hooks.get(&hook).cloned() else {
            return Box::pin(future::ready(Err(HookError::Undefined(hook))));
        };

        Box::pin(async move {
            for tap in taps {
                log::trace!("running {} tap {}", hook, tap.key);
                if let Err(reason) = (tap.callback)(&payload).into_future().await {
                    log::warn!("{} tap {} rejected: {}", hook, tap.key, reason);
                    return Err(HookError::Rejected {
                        hook,
                        tap: tap.key,
                        reason,
                    });
                }
            }
            Ok(())
        })
    }

    /// Drop every hook and tap.
    pub fn clear(&mut self) {
        self.hooks.clear();
    }
}
