//! Minimal passive-mode FTP client used as the fallback store.
//!
//! Every operation opens its own control connection, logs in, runs and quits.
//! Connecting, each control reply and each data read or write are bounded by
//! the store's I/O timeout; a transfer as a whole is not.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::error::{FailureKind, RemoteStoreError, StoreResult};
use super::store::{base_name, path_prefixes, EntryKind, RemoteEntry, RemoteStore};
use crate::settings::Credentials;

/// Size of one data-connection write.
const DATA_CHUNK: usize = 64 * 1024;

/// How long the server may take to confirm a finished transfer. Servers
/// answer only after flushing the file, which can take a while on a NAS.
const TRANSFER_COMPLETION_TIMEOUT: Duration = Duration::from_secs(600);

pub struct FtpStore {
    host: String,
    port: u16,
    credentials: Credentials,
    timeout: Duration,
}

impl FtpStore {
    pub fn new(host: &str, port: u16, credentials: &Credentials, timeout: Duration) -> Self {
        Self {
            host: host.trim().to_string(),
            port,
            credentials: credentials.clone(),
            timeout,
        }
    }

    async fn with_session<T, F, Fut>(&self, op: F) -> StoreResult<T>
    where
        F: FnOnce(FtpSession) -> Fut,
        Fut: Future<Output = (FtpSession, StoreResult<T>)>,
    {
        let session =
            FtpSession::open(&self.host, self.port, &self.credentials, self.timeout).await?;
        let (mut session, result) = op(session).await;
        session.quit().await;
        result
    }
}

#[async_trait]
impl RemoteStore for FtpStore {
    fn protocol(&self) -> &'static str {
        "ftp"
    }

    async fn test_connectivity(&self) -> StoreResult<()> {
        self.with_session(|session| async move { (session, Ok(())) })
            .await
    }

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        let path = path.to_string();
        self.with_session(|mut session| async move {
            let result = session.exists(&path).await;
            (session, result)
        })
        .await
    }

    async fn create_directory(&self, path: &str, recursive: bool) -> StoreResult<()> {
        let targets = if recursive {
            path_prefixes(path)
        } else {
            vec![format!("/{}", path.trim_matches('/'))]
        };
        self.with_session(|mut session| async move {
            let mut result = Ok(());
            for target in targets {
                result = session.make_directory(&target).await;
                if result.is_err() {
                    break;
                }
            }
            (session, result)
        })
        .await
    }

    async fn list_directory(&self, path: &str) -> StoreResult<Vec<RemoteEntry>> {
        let path = format!("/{}", path.trim_matches('/'));
        self.with_session(|mut session| async move {
            let result = session.list(&path).await;
            (session, result)
        })
        .await
    }

    async fn put_file(&self, path: &str, bytes: Bytes, overwrite: bool) -> StoreResult<()> {
        let path = path.to_string();
        self.with_session(|mut session| async move {
            let result = async {
                if !overwrite && session.exists(&path).await? {
                    return Err(RemoteStoreError::unknown(format!("{path} already exists")));
                }
                session.store(&path, &bytes).await
            }
            .await;
            (session, result)
        })
        .await
    }

    async fn get_file(&self, path: &str) -> StoreResult<Bytes> {
        let path = path.to_string();
        self.with_session(|mut session| async move {
            let result = session.retrieve(&path).await;
            (session, result)
        })
        .await
    }

    async fn delete_file(&self, path: &str) -> StoreResult<()> {
        let path = path.to_string();
        self.with_session(|mut session| async move {
            let result = async {
                if !session.exists(&path).await? {
                    return Ok(());
                }
                let reply = session.command(&format!("DELE {path}")).await?;
                reply.require(&[250], "DELE", &path)
            }
            .await;
            (session, result)
        })
        .await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Reply {
    code: u16,
    message: String,
}

impl Reply {
    fn is(&self, code: u16) -> bool {
        self.code == code
    }

    fn require(self, codes: &[u16], command: &str, path: &str) -> StoreResult<()> {
        if codes.contains(&self.code) {
            Ok(())
        } else {
            Err(self.into_error(command, path))
        }
    }

    fn into_error(self, command: &str, path: &str) -> RemoteStoreError {
        let message = format!("FTP {command} {path} failed: {} {}", self.code, self.message);
        match self.code {
            530 | 532 => RemoteStoreError::unauthorized(message),
            421 | 425 | 426 => RemoteStoreError::unreachable(message),
            _ => RemoteStoreError::unknown(message),
        }
    }
}

/// Runs one I/O step, failing with a timeout error once `limit` passes.
async fn bounded<T, Fut>(limit: Duration, step: &str, work: Fut) -> StoreResult<T>
where
    Fut: Future<Output = StoreResult<T>>,
{
    match timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => Err(RemoteStoreError::timeout(format!(
            "FTP {step} did not complete within {}s",
            limit.as_secs()
        ))),
    }
}

struct FtpSession {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    host: String,
    timeout: Duration,
}

impl FtpSession {
    async fn open(
        host: &str,
        port: u16,
        credentials: &Credentials,
        io_timeout: Duration,
    ) -> StoreResult<Self> {
        let stream = bounded(io_timeout, "connect", async {
            TcpStream::connect((host, port)).await.map_err(|err| {
                RemoteStoreError::unreachable(format!(
                    "FTP server {host}:{port} not reachable: {err}"
                ))
            })
        })
        .await?;
        let (read, write) = stream.into_split();
        let mut session = Self {
            reader: BufReader::new(read),
            writer: write,
            host: host.to_string(),
            timeout: io_timeout,
        };

        session.read_reply().await?.require(&[220], "connect", host)?;

        let user = session
            .command(&format!("USER {}", credentials.username))
            .await?;
        if user.is(331) {
            session
                .command(&format!("PASS {}", credentials.password))
                .await?
                .require(&[230, 202], "login", host)?;
        } else {
            user.require(&[230], "login", host)?;
        }

        // Servers without UTF8 support reply 5xx; names are still sent as UTF-8.
        let _ = session.command("OPTS UTF8 ON").await?;
        session.command("TYPE I").await?.require(&[200], "TYPE", host)?;
        Ok(session)
    }

    async fn read_reply(&mut self) -> StoreResult<Reply> {
        self.read_reply_within(self.timeout).await
    }

    async fn read_reply_within(&mut self, limit: Duration) -> StoreResult<Reply> {
        let first = self.read_line(limit).await?;
        let code = parse_reply_code(&first)?;
        let mut message = first.get(4..).unwrap_or_default().trim().to_string();

        if first.as_bytes().get(3) == Some(&b'-') {
            let terminator = format!("{code} ");
            loop {
                let line = self.read_line(limit).await?;
                if line.starts_with(&terminator) {
                    message = line[terminator.len()..].trim().to_string();
                    break;
                }
            }
        }

        Ok(Reply { code, message })
    }

    async fn read_line(&mut self, limit: Duration) -> StoreResult<String> {
        let mut line = String::new();
        let read = bounded(limit, "reply", async {
            self.reader.read_line(&mut line).await.map_err(|err| {
                RemoteStoreError::unreachable(format!("FTP control read failed: {err}"))
            })
        })
        .await?;
        if read == 0 {
            return Err(RemoteStoreError::unreachable(
                "FTP server closed the control connection",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Sends one control line. Arguments containing line breaks are refused,
    /// they would end the line early and smuggle in a second command.
    async fn command(&mut self, command: &str) -> StoreResult<Reply> {
        if command.contains(['\r', '\n']) {
            return Err(RemoteStoreError::unknown(
                "FTP command arguments must not contain line breaks",
            ));
        }
        let line = format!("{command}\r\n");
        bounded(self.timeout, "command", async {
            self.writer.write_all(line.as_bytes()).await.map_err(|err| {
                RemoteStoreError::unreachable(format!("FTP control write failed: {err}"))
            })
        })
        .await?;
        self.read_reply().await
    }

    async fn quit(&mut self) {
        let _ = self.command("QUIT").await;
    }

    async fn exists(&mut self, path: &str) -> StoreResult<bool> {
        let size = self.command(&format!("SIZE {path}")).await?;
        if size.is(213) {
            return Ok(true);
        }
        if matches!(size.code, 530 | 532 | 421) {
            return Err(size.into_error("SIZE", path));
        }
        let cwd = self.command(&format!("CWD {path}")).await?;
        match cwd.code {
            250 => Ok(true),
            550 => Ok(false),
            _ => Err(cwd.into_error("CWD", path)),
        }
    }

    async fn make_directory(&mut self, path: &str) -> StoreResult<()> {
        if self.command(&format!("CWD {path}")).await?.is(250) {
            return Ok(());
        }
        let reply = self.command(&format!("MKD {path}")).await?;
        if reply.is(257) {
            return Ok(());
        }
        // Another client may have created it in between.
        if reply.is(550) && self.command(&format!("CWD {path}")).await?.is(250) {
            return Ok(());
        }
        Err(reply.into_error("MKD", path))
    }

    async fn open_data(&mut self) -> StoreResult<TcpStream> {
        let epsv = self.command("EPSV").await?;
        let port = if epsv.is(229) {
            parse_epsv_port(&epsv.message)
        } else {
            let pasv = self.command("PASV").await?;
            if !pasv.is(227) {
                return Err(pasv.into_error("PASV", ""));
            }
            parse_pasv_port(&pasv.message)
        }
        .ok_or_else(|| RemoteStoreError::unknown("FTP server sent an unreadable passive reply"))?;

        // The advertised PASV address is ignored; NAS boxes behind NAT often
        // report their private address.
        let host = self.host.as_str();
        bounded(self.timeout, "data connect", async {
            TcpStream::connect((host, port)).await.map_err(|err| {
                RemoteStoreError::unreachable(format!("FTP data connection failed: {err}"))
            })
        })
        .await
    }

    async fn begin_transfer(&mut self, command: &str, path: &str) -> StoreResult<TcpStream> {
        let data = self.open_data().await?;
        let reply = self.command(&format!("{command} {path}")).await?;
        if reply.is(125) || reply.is(150) {
            return Ok(data);
        }
        if reply.is(550) && command == "RETR" {
            return Err(RemoteStoreError::NotFound(path.to_string()));
        }
        Err(reply.into_error(command, path))
    }

    async fn finish_transfer(&mut self, command: &str, path: &str) -> StoreResult<()> {
        self.read_reply_within(TRANSFER_COMPLETION_TIMEOUT)
            .await?
            .require(&[226, 250], command, path)
    }

    /// Reads the data connection to its end; only a stalled read times out.
    async fn drain(&self, data: &mut TcpStream, what: &str) -> StoreResult<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut chunk = vec![0u8; DATA_CHUNK];
        loop {
            let read = bounded(self.timeout, what, async {
                data.read(&mut chunk).await.map_err(|err| {
                    RemoteStoreError::unreachable(format!("FTP {what} failed: {err}"))
                })
            })
            .await?;
            if read == 0 {
                return Ok(buffer);
            }
            buffer.extend_from_slice(&chunk[..read]);
        }
    }

    async fn store(&mut self, path: &str, bytes: &[u8]) -> StoreResult<()> {
        let mut data = self.begin_transfer("STOR", path).await?;
        for chunk in bytes.chunks(DATA_CHUNK) {
            bounded(self.timeout, "upload", async {
                data.write_all(chunk).await.map_err(|err| {
                    RemoteStoreError::unreachable(format!("FTP upload failed: {err}"))
                })
            })
            .await?;
        }
        bounded(self.timeout, "upload", async {
            data.shutdown()
                .await
                .map_err(|err| RemoteStoreError::unreachable(format!("FTP upload failed: {err}")))
        })
        .await?;
        drop(data);
        self.finish_transfer("STOR", path).await
    }

    async fn retrieve(&mut self, path: &str) -> StoreResult<Bytes> {
        let mut data = self.begin_transfer("RETR", path).await?;
        let buffer = self.drain(&mut data, "download").await?;
        drop(data);
        self.finish_transfer("RETR", path).await?;
        Ok(Bytes::from(buffer))
    }

    async fn list(&mut self, path: &str) -> StoreResult<Vec<RemoteEntry>> {
        let cwd = self.command(&format!("CWD {path}")).await?;
        if cwd.is(550) {
            return Ok(Vec::new());
        }
        cwd.require(&[250], "CWD", path)?;

        let (raw, machine_readable) = match self.read_listing("MLSD", path).await {
            Ok(raw) => (raw, true),
            // Servers without MLSD answer 500/502; anything else is a real failure.
            Err(err) if err.kind() == FailureKind::Unknown && !err.is_not_found() => {
                (self.read_listing("LIST", path).await?, false)
            }
            Err(err) => return Err(err),
        };

        let entries = raw
            .lines()
            .filter_map(|line| {
                if machine_readable {
                    parse_mlsd_line(line)
                } else {
                    parse_list_line(line)
                }
            })
            .filter(|(name, _, _)| name != "." && name != "..")
            .map(|(name, kind, size_bytes)| {
                let full_path = format!("{}/{}", path.trim_end_matches('/'), name);
                RemoteEntry {
                    base_name: base_name(&full_path),
                    full_path,
                    size_bytes,
                    kind,
                }
            })
            .collect();
        Ok(entries)
    }

    async fn read_listing(&mut self, command: &str, path: &str) -> StoreResult<String> {
        let mut data = self.begin_transfer(command, path).await?;
        let buffer = self.drain(&mut data, "listing").await?;
        drop(data);
        self.finish_transfer(command, path).await?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn parse_reply_code(line: &str) -> StoreResult<u16> {
    line.get(..3)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| RemoteStoreError::unknown(format!("malformed FTP reply: {line}")))
}

/// `229 Entering Extended Passive Mode (|||50012|)`
fn parse_epsv_port(message: &str) -> Option<u16> {
    let start = message.find("(|||")? + 4;
    let rest = &message[start..];
    let end = rest.find('|')?;
    rest[..end].parse().ok()
}

/// `227 Entering Passive Mode (192,168,1,10,195,80)`
fn parse_pasv_port(message: &str) -> Option<u16> {
    let start = message.find('(')? + 1;
    let end = message[start..].find(')')? + start;
    let numbers = message[start..end]
        .split(',')
        .map(|part| part.trim().parse::<u16>().ok())
        .collect::<Option<Vec<_>>>()?;
    if numbers.len() != 6 || numbers[4] > 255 || numbers[5] > 255 {
        return None;
    }
    Some(numbers[4] * 256 + numbers[5])
}

/// `type=file;size=1024;modify=20240101120000; front.jpg`
fn parse_mlsd_line(line: &str) -> Option<(String, EntryKind, u64)> {
    let (facts, name) = line.split_once(' ')?;
    let name = name.to_string();
    let mut kind = None;
    let mut size = 0;
    for fact in facts.split(';').filter(|fact| !fact.is_empty()) {
        let (key, value) = fact.split_once('=')?;
        match key.to_ascii_lowercase().as_str() {
            "type" => {
                kind = match value.to_ascii_lowercase().as_str() {
                    "file" => Some(EntryKind::File),
                    "dir" => Some(EntryKind::Directory),
                    _ => None,
                }
            }
            "size" => size = value.parse().unwrap_or(0),
            _ => {}
        }
    }
    kind.map(|kind| (name, kind, size))
}

/// Unix style `LIST` output: `drwxr-xr-x 2 owner group 4096 Jan 01 12:00 name`
fn parse_list_line(line: &str) -> Option<(String, EntryKind, u64)> {
    let mut rest = line.trim_start();
    let mut fields = Vec::with_capacity(8);
    for _ in 0..8 {
        let end = rest.find(char::is_whitespace)?;
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    if rest.is_empty() {
        return None;
    }
    let kind = match fields[0].chars().next()? {
        'd' => EntryKind::Directory,
        '-' => EntryKind::File,
        _ => return None,
    };
    let size = fields[4].parse().unwrap_or(0);
    Some((rest.to_string(), kind, size))
}
