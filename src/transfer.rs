//! SFTP transfer session built on libssh2.

use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use ssh2::{ErrorCode, Session, Sftp};

use crate::config::Config;
use crate::traits::{TransferError, TransferSession};

/// An authenticated SFTP session, kept open for the life of the process.
///
/// Dropping the session disconnects it.
pub struct SftpSession {
    // Dropped before `session`.
    sftp: Sftp,
    session: Session,
    remote_dir: PathBuf,
    closed: bool,
}

impl SftpSession {
    /// Connect, authenticate with username/password and open SFTP.
    pub fn connect(config: &Config) -> Result<Self, TransferError> {
        let tcp = TcpStream::connect((config.host.as_str(), config.port)).map_err(|source| {
            TransferError::Connect {
                host: config.host.clone(),
                port: config.port,
                source,
            }
        })?;

        let mut session = Session::new().map_err(protocol)?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(protocol)?;
        session
            .userauth_password(&config.username, &config.password)
            .map_err(|_| TransferError::AuthRejected {
                username: config.username.clone(),
            })?;
        if !session.authenticated() {
            return Err(TransferError::AuthRejected {
                username: config.username.clone(),
            });
        }

        let sftp = session.sftp().map_err(protocol)?;
        log::debug!("SFTP subsystem open on {}:{}", config.host, config.port);

        Ok(Self {
            sftp,
            session,
            remote_dir: PathBuf::from(&config.remote_dir),
            closed: false,
        })
    }

    /// Remote path an image named `remote_name` is written to.
    pub fn remote_path(&self, remote_name: &str) -> PathBuf {
        self.remote_dir.join(remote_name)
    }
}

impl TransferSession for SftpSession {
    fn put(&mut self, local_path: &Path, remote_name: &str) -> Result<(), TransferError> {
        let mut local = File::open(local_path).map_err(|err| TransferError::Failed {
            name: remote_name.to_owned(),
            reason: format!("{}: {err}", local_path.display()),
        })?;

        let remote_path = self.remote_path(remote_name);
        let mut remote = self
            .sftp
            .create(&remote_path)
            .map_err(|err| classify(remote_name, &err))?;

        stream_to(remote_name, &mut local, &mut remote)
    }

    /// Disconnect from the server. Later calls are no-ops.
    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self
            .session
            .disconnect(None, "pi-cam-uplink shutting down", None)
        {
            log::warn!("SSH disconnect failed: {err}");
        }
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Remote end of one upload.
trait RemoteFile: Write {
    /// Release the remote handle; the server confirms the write here.
    fn finish(&mut self) -> Result<(), ssh2::Error>;
}

impl RemoteFile for ssh2::File {
    fn finish(&mut self) -> Result<(), ssh2::Error> {
        self.close()
    }
}

/// Copy `local` into `remote` and wait for the server to confirm the close.
///
/// An upload only counts once the handle is closed without error.
fn stream_to<R: Read, F: RemoteFile>(
    remote_name: &str,
    local: &mut R,
    remote: &mut F,
) -> Result<(), TransferError> {
    io::copy(local, remote).map_err(|err| classify_io(remote_name, &err))?;
    remote.flush().map_err(|err| classify_io(remote_name, &err))?;
    remote.finish().map_err(|err| classify(remote_name, &err))
}

fn protocol(err: ssh2::Error) -> TransferError {
    TransferError::Protocol(err.to_string())
}

/// SFTP status codes concern one file; libssh2 session codes concern the link.
fn classify(remote_name: &str, err: &ssh2::Error) -> TransferError {
    match err.code() {
        ErrorCode::SFTP(_) => TransferError::Failed {
            name: remote_name.to_owned(),
            reason: err.to_string(),
        },
        ErrorCode::Session(_) => TransferError::Protocol(err.to_string()),
    }
}

/// Writes through an `ssh2::File` report libssh2 errors wrapped in
/// `io::Error` with kind `Other`, so the wrapped code decides first.
fn classify_io(remote_name: &str, err: &io::Error) -> TransferError {
    if let Some(ssh) = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<ssh2::Error>())
    {
        return classify(remote_name, ssh);
    }
    if is_link_failure(err.kind()) {
        TransferError::Protocol(err.to_string())
    } else {
        TransferError::Failed {
            name: remote_name.to_owned(),
            reason: err.to_string(),
        }
    }
}

const fn is_link_failure(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::TimedOut
            | ErrorKind::UnexpectedEof
    )
}
