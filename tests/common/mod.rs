//! Scripted FTPS server for integration tests.
//!
//! Serves one control connection on loopback: plaintext greeting and
//! `AUTH TLS`, then everything else over TLS, with passive data
//! connections encrypted by the same acceptor.

#![allow(dead_code)]

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;

use ftps_client::config::{AuthConfig, ClientConfig, LimitsConfig, LocalConfig, ServerConfig, TlsConfig};

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "alice123";

/// Ways the mock server breaks a data connection after answering `150`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFault {
    /// Plaintext bytes instead of a TLS handshake, then `426`
    NotTls,
    /// Reads one chunk of an upload, resets the socket, then `426`
    DropMidUpload,
}

/// How the mock server behaves
pub struct MockOptions {
    pub listing: Vec<u8>,
    pub files: HashMap<String, Vec<u8>>,
    /// Address put in PASV replies instead of 127.0.0.1
    pub announce_ip: Option<[u8; 4]>,
    pub data_fault: Option<DataFault>,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            listing: b"-rw-r--r-- 1 ftp ftp 12 Jan 01 00:00 notes.txt\r\n".to_vec(),
            files: HashMap::new(),
            announce_ip: None,
            data_fault: None,
        }
    }
}

/// What the server saw
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    /// Commands received before the TLS upgrade
    pub plaintext: Vec<String>,
    /// Commands received over TLS
    pub encrypted: Vec<String>,
    pub data_connections: usize,
    pub files: HashMap<String, Vec<u8>>,
}

impl Recorded {
    pub fn saw(&self, verb: &str) -> bool {
        self.encrypted
            .iter()
            .any(|c| c.split_whitespace().next() == Some(verb))
    }
}

pub struct MockServer {
    pub addr: SocketAddr,
    ca_file: NamedTempFile,
    recorded: Arc<Mutex<Recorded>>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(options: MockOptions) -> Self {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let mut ca_file = NamedTempFile::new().unwrap();
        ca_file
            .write_all(cert.serialize_pem().unwrap().as_bytes())
            .unwrap();

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let tls_config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(
                vec![CertificateDer::from(cert.serialize_der().unwrap())],
                PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(cert.serialize_private_key_der())),
            )
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(tls_config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let recorded = Arc::new(Mutex::new(Recorded {
            files: options.files.clone(),
            ..Recorded::default()
        }));
        let task = tokio::spawn(serve(listener, acceptor, options, recorded.clone()));

        Self {
            addr,
            ca_file,
            recorded,
            task,
        }
    }

    /// Client configuration that trusts this server.
    pub fn client_config(&self, local_dir: &Path) -> ClientConfig {
        ClientConfig {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: self.addr.port(),
                connect_timeout_secs: 5,
                reply_timeout_secs: 10,
                pasv_nat_workaround: false,
            },
            auth: AuthConfig {
                username: USERNAME.into(),
                password: PASSWORD.into(),
            },
            tls: TlsConfig {
                server_name: Some("localhost".into()),
                ca_file: Some(self.ca_file.path().to_string_lossy().to_string()),
                relaxed_security: false,
            },
            limits: LimitsConfig::default(),
            local: LocalConfig {
                directory: local_dir.to_string_lossy().to_string(),
            },
        }
    }

    pub fn recorded(&self) -> Recorded {
        self.recorded.lock().unwrap().clone()
    }

    /// Waits for the control connection to end.
    pub async fn finish(self) -> Recorded {
        let _ = tokio::time::timeout(Duration::from_secs(10), self.task).await;
        self.recorded.lock().unwrap().clone()
    }
}

async fn serve(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    options: MockOptions,
    recorded: Arc<Mutex<Recorded>>,
) {
    let Ok((tcp, _)) = listener.accept().await else {
        return;
    };

    let mut plain = BufReader::new(tcp);
    reply(&mut plain, "220 Mock FTPS ready").await;
    loop {
        let Some(line) = read_command(&mut plain).await else {
            return;
        };
        recorded.lock().unwrap().plaintext.push(line.clone());
        if line.eq_ignore_ascii_case("AUTH TLS") {
            reply(&mut plain, "234 Proceed with negotiation.").await;
            break;
        }
        reply(&mut plain, "530 Please login with AUTH TLS first.").await;
    }

    let Ok(tls) = acceptor.accept(plain.into_inner()).await else {
        return;
    };
    let mut control = BufReader::new(tls);
    let mut passive: Option<TcpListener> = None;

    loop {
        let Some(line) = read_command(&mut control).await else {
            return;
        };
        recorded.lock().unwrap().encrypted.push(line.clone());

        let (verb, arg) = match line.split_once(' ') {
            Some((verb, arg)) => (verb.to_ascii_uppercase(), arg.to_string()),
            None => (line.to_ascii_uppercase(), String::new()),
        };

        match verb.as_str() {
            "PBSZ" => reply(&mut control, "200 PBSZ=0").await,
            "PROT" => reply(&mut control, "200 Protection level set to P").await,
            "USER" if arg == USERNAME => {
                reply(&mut control, "331 Please specify the password.").await
            }
            "USER" => reply(&mut control, "530 Unknown user.").await,
            "PASS" if arg == PASSWORD => reply(&mut control, "230 Login successful.").await,
            "PASS" => reply(&mut control, "530 Login incorrect.").await,
            "PASV" => {
                let data = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let port = data.local_addr().unwrap().port();
                let [a, b, c, d] = options.announce_ip.unwrap_or([127, 0, 0, 1]);
                let text = format!(
                    "227 Entering Passive Mode ({},{},{},{},{},{}).",
                    a,
                    b,
                    c,
                    d,
                    port / 256,
                    port % 256
                );
                reply(&mut control, &text).await;
                passive = Some(data);
            }
            "LIST" => {
                let Some(data) = passive.take() else {
                    reply(&mut control, "425 Use PASV first.").await;
                    continue;
                };
                reply(&mut control, "150 Here comes the directory listing.").await;
                if options.data_fault == Some(DataFault::NotTls) {
                    send_plaintext(&data, &recorded).await;
                    reply(&mut control, "426 Connection closed; transfer aborted.").await;
                    continue;
                }
                match accept_data(&data, &acceptor, &recorded).await {
                    Some(mut stream) => {
                        let _ = stream.write_all(&options.listing).await;
                        finish_sending(stream).await;
                        reply(&mut control, "226 Directory send OK.").await;
                    }
                    None => reply(&mut control, "425 Failed to establish connection.").await,
                }
            }
            "RETR" => {
                let contents = recorded.lock().unwrap().files.get(&arg).cloned();
                let Some(contents) = contents else {
                    passive = None;
                    reply(&mut control, "550 Failed to open file.").await;
                    continue;
                };
                let Some(data) = passive.take() else {
                    reply(&mut control, "425 Use PASV first.").await;
                    continue;
                };
                let text = format!(
                    "150 Opening BINARY mode data connection for {} ({} bytes).",
                    arg,
                    contents.len()
                );
                reply(&mut control, &text).await;
                if options.data_fault == Some(DataFault::NotTls) {
                    send_plaintext(&data, &recorded).await;
                    reply(&mut control, "426 Connection closed; transfer aborted.").await;
                    continue;
                }
                match accept_data(&data, &acceptor, &recorded).await {
                    Some(mut stream) => {
                        let _ = stream.write_all(&contents).await;
                        finish_sending(stream).await;
                        reply(&mut control, "226 Transfer complete.").await;
                    }
                    None => reply(&mut control, "425 Failed to establish connection.").await,
                }
            }
            "STOR" => {
                let Some(data) = passive.take() else {
                    reply(&mut control, "425 Use PASV first.").await;
                    continue;
                };
                reply(&mut control, "150 Ok to send data.").await;
                if options.data_fault == Some(DataFault::NotTls) {
                    send_plaintext(&data, &recorded).await;
                    reply(&mut control, "426 Connection closed; transfer aborted.").await;
                    continue;
                }
                match accept_data(&data, &acceptor, &recorded).await {
                    Some(mut stream) if options.data_fault == Some(DataFault::DropMidUpload) => {
                        let mut chunk = [0u8; 1024];
                        let _ = stream.read(&mut chunk).await;
                        // Unread data pending: closing the socket sends RST
                        drop(stream);
                        reply(&mut control, "426 Connection closed; transfer aborted.").await;
                    }
                    Some(mut stream) => {
                        let mut contents = Vec::new();
                        match stream.read_to_end(&mut contents).await {
                            Ok(_) => {
                                recorded.lock().unwrap().files.insert(arg, contents);
                                reply(&mut control, "226 Transfer complete.").await;
                            }
                            Err(_) => reply(&mut control, "426 Failure reading network stream.").await,
                        }
                    }
                    None => reply(&mut control, "425 Failed to establish connection.").await,
                }
            }
            "NOOP" => reply(&mut control, "200 NOOP ok.").await,
            "FEAT" => reply(&mut control, "211-Features:\r\n PASV\r\n PBSZ\r\n PROT\r\n211 End").await,
            "QUIT" => {
                reply(&mut control, "221 Goodbye.").await;
                let _ = control.get_mut().shutdown().await;
                return;
            }
            // Vanish without a reply
            "DROP" => return,
            _ => reply(&mut control, "500 Unknown command.").await,
        }
    }
}

async fn accept_tcp(
    listener: &TcpListener,
    recorded: &Arc<Mutex<Recorded>>,
) -> Option<tokio::net::TcpStream> {
    let accepted = tokio::time::timeout(Duration::from_secs(5), listener.accept()).await;
    let Ok(Ok((tcp, _))) = accepted else {
        return None;
    };
    recorded.lock().unwrap().data_connections += 1;
    Some(tcp)
}

async fn accept_data(
    listener: &TcpListener,
    acceptor: &TlsAcceptor,
    recorded: &Arc<Mutex<Recorded>>,
) -> Option<TlsStream<tokio::net::TcpStream>> {
    let tcp = accept_tcp(listener, recorded).await?;
    acceptor.accept(tcp).await.ok()
}

/// Answers the client's ClientHello with something that is not TLS.
async fn send_plaintext(listener: &TcpListener, recorded: &Arc<Mutex<Recorded>>) {
    if let Some(mut tcp) = accept_tcp(listener, recorded).await {
        let _ = tcp.write_all(b"this is not a TLS record\r\n").await;
        let _ = tcp.shutdown().await;
        let mut rest = Vec::new();
        let _ = tokio::time::timeout(Duration::from_secs(2), tcp.read_to_end(&mut rest)).await;
    }
}

/// close_notify, then wait for the client's before dropping the socket.
async fn finish_sending(mut stream: TlsStream<tokio::net::TcpStream>) {
    let _ = stream.shutdown().await;
    let mut rest = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut rest)).await;
}

async fn read_command<S>(stream: &mut BufReader<S>) -> Option<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut line = String::new();
    match stream.read_line(&mut line).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}

async fn reply<S>(stream: &mut BufReader<S>, text: &str)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let _ = stream.write_all(format!("{}\r\n", text).as_bytes()).await;
    let _ = stream.flush().await;
}
