//! Mio enabled threading.
//!
//! A spawned thread owns a `mio::Poll` with a private registration on the
//! `SYSTEM` token. The thread's closure is expected to poll for events on that
//! token and exit when one arrives; `ThreadHandle::shutdown` raises it.

use constants;
use mio;
use std::io;
use std::thread;

/// Mio enabled thread state.
pub struct ThreadHandle {
    handle: thread::JoinHandle<()>,
    readiness: mio::SetReadiness,
}

impl ThreadHandle {
    /// Join the thread, blocking until it exits.
    pub fn join(self) -> io::Result<()> {
        self.handle
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "child thread panicked"))
    }

    /// Signal the thread on its SYSTEM token and wait for it to exit.
    pub fn shutdown(self) -> io::Result<()> {
        self.readiness.set_readiness(mio::Ready::readable())?;
        self.join()
    }
}

/// Spawn a new thread executing `f` with a poller it can wait on.
pub fn spawn<F>(name: &str, f: F) -> io::Result<ThreadHandle>
where
    F: Send + 'static + FnOnce(mio::Poll) -> (),
{
    let poller = mio::Poll::new()?;
    let (registration, readiness) = mio::Registration::new2();
    poller.register(
        &registration,
        constants::SYSTEM,
        mio::Ready::readable(),
        mio::PollOpt::edge(),
    )?;

    let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
        // the registration must outlive polling or the SYSTEM event is lost
        let _registration = registration;
        f(poller);
    })?;
    Ok(ThreadHandle {
        handle: handle,
        readiness: readiness,
    })
}
