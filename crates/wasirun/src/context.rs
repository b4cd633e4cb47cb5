//! Store context for running module instances.

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Instant;

/// Execution limits applied to an instance's store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Budget {
    /// Fuel units available to the guest. `None` means unmetered.
    pub fuel: Option<u64>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self { fuel: None }
    }

    pub fn fuel(fuel: u64) -> Self {
        Self { fuel: Some(fuel) }
    }

    pub(crate) fn fuel_or_max(&self) -> u64 {
        self.fuel.unwrap_or(u64::MAX)
    }
}

/// An in-memory sink that can be read back after the guest has run.
#[derive(Clone, Debug, Default)]
pub struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buf.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    fn append(&self, bytes: &[u8]) {
        self.buf
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(bytes);
    }
}

/// Where a guest output stream goes.
#[derive(Clone, Debug, Default)]
pub enum Output {
    /// The host process's own stream.
    #[default]
    Inherit,
    Capture(Capture),
    Discard,
}

impl Output {
    pub(crate) fn write_all(&self, fd: u32, bytes: &[u8]) -> std::io::Result<()> {
        match self {
            Self::Inherit if fd == 2 => std::io::stderr().write_all(bytes),
            Self::Inherit => std::io::stdout().write_all(bytes),
            Self::Capture(capture) => {
                capture.append(bytes);
                Ok(())
            }
            Self::Discard => Ok(()),
        }
    }
}

/// A staging area for state that will be baked into the `HostCtx`.
///
/// Lets the embedder provision arguments, environment and output sinks before
/// the store exists.
#[derive(Clone, Debug, Default)]
pub struct ContextBuilder {
    args: Vec<String>,
    env: Vec<(String, String)>,
    stdout: Output,
    stderr: Output,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdout(&mut self, output: Output) -> &mut Self {
        self.stdout = output;
        self
    }

    pub fn stderr(&mut self, output: Output) -> &mut Self {
        self.stderr = output;
        self
    }

    pub fn build(self) -> HostCtx {
        HostCtx {
            args: self.args,
            env: self.env,
            stdout: self.stdout,
            stderr: self.stderr,
            epoch: Instant::now(),
        }
    }
}

/// Per-instance state stored in the engine's `Store`.
///
/// Host functions reach it through their `Caller`.
#[derive(Debug)]
pub struct HostCtx {
    args: Vec<String>,
    env: Vec<(String, String)>,
    stdout: Output,
    stderr: Output,
    epoch: Instant,
}

impl HostCtx {
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Moment the context was built; zero of the monotonic clock.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// The sink behind a guest file descriptor, if it has one.
    pub fn output(&self, fd: u32) -> Option<&Output> {
        match fd {
            1 => Some(&self.stdout),
            2 => Some(&self.stderr),
            _ => None,
        }
    }
}

impl Default for HostCtx {
    fn default() -> Self {
        ContextBuilder::new().build()
    }
}
