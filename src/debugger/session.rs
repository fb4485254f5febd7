use crate::config::DebuggerConfig;
use crate::protocol::{spawn_reader, Protocol};
use crate::Result;
use log::{debug, info, warn};
use std::io;
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const QUIT_GRACE: Duration = Duration::from_millis(500);

/// A running ghci process: stdin is driven by the protocol, stdout and stderr
/// share one pipe read by a background thread so diagnostics keep their place
/// relative to the prompt.
pub struct GhciSession {
    child: Child,
    protocol: Protocol<ChildStdin>,
    reader: Option<JoinHandle<()>>,
}

impl GhciSession {
    pub fn start(config: &DebuggerConfig, module: Option<&Path>) -> Result<Self> {
        let (output, output_writer) = os_pipe::pipe()?;
        let error_writer = output_writer.try_clone()?;

        let mut command = Command::new(&config.ghci_path);
        command
            .args(&config.ghci_args)
            .stdin(Stdio::piped())
            .stdout(output_writer)
            .stderr(error_writer);
        if let Some(module) = module {
            command.arg(module);
        }

        info!("starting {:?}", command);
        let mut child = command.spawn()?;
        // the command keeps copies of the pipe writers, the reader sees EOF only once they are gone
        drop(command);

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "ghci stdin is not captured"))?;

        let (events_tx, events_rx) = mpsc::channel();
        let reader = spawn_reader(output, config.prompt_sentinel.clone(), events_tx)?;

        let mut session = Self {
            child,
            protocol: Protocol::new(stdin, events_rx, config.response_timeout()),
            reader: Some(reader),
        };

        if let Err(e) = session.install_prompt(config) {
            session.shutdown();
            return Err(e);
        }
        info!("ghci started, pid {}", session.id());
        Ok(session)
    }

    /// Banner and module loading end with the default prompt, which is
    /// followed by the sentinel prompt once the new prompt is installed.
    fn install_prompt(&mut self, config: &DebuggerConfig) -> Result<()> {
        self.protocol.send_line(&config.prompt_command())?;
        let banner = self.protocol.wait_for_prompt(config.startup_timeout())?;
        debug!("ghci startup output: {:?}", banner);
        Ok(())
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn protocol_mut(&mut self) -> &mut Protocol<ChildStdin> {
        &mut self.protocol
    }

    /// Ask ghci to quit, kill it if it does not exit in time and release the
    /// output reader.
    pub fn shutdown(mut self) {
        self.protocol.fail_pending();
        if let Err(e) = self.protocol.send_line(":quit") {
            debug!("cannot send :quit: {e}");
        }

        let deadline = Instant::now() + QUIT_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    info!("ghci exited with {status}");
                    break;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(20)),
                Ok(None) => {
                    warn!("ghci did not quit, killing pid {}", self.child.id());
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break;
                }
                Err(e) => {
                    warn!("cannot wait for ghci: {e}");
                    let _ = self.child.kill();
                    break;
                }
            }
        }

        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}
