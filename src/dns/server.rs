use crate::config::Shared;
use crate::dns::handlers::Handler;
use crate::dns::relay::{AcmeRelay, UdpUpstreamResolver};
use crate::dns::router::QueryRouter;
use crate::dns::synth::AnswerSynthesizer;
use crate::visitor_store::DynVisitorStore;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tracing::{debug, error};

/// Largest UDP datagram read from a client.
const MAX_UDP_MESSAGE: usize = 4_096;

/// Build the [`QueryRouter`] described by `config`, relaying over UDP.
#[must_use]
pub fn router(config: &Shared, visitor_store: DynVisitorStore) -> QueryRouter {
    let relay = AcmeRelay::new(
        config.acme_challenge_domain.clone(),
        config.acme_upstream_servers.clone(),
        Arc::new(UdpUpstreamResolver::new(config.acme_upstream_timeout)),
    );
    QueryRouter::new(AnswerSynthesizer::new(config.clone()), relay, visitor_store)
}

/// Bound DNS listeners, served by [`DnsServer::block_until_done`].
pub struct DnsServer {
    handler: Handler,
    udp: UdpSocket,
    tcp: Option<(TcpListener, Duration)>,
}

/// Bind the DNS listeners described by `config`.
///
/// # Errors
///
/// Returns an error if a listener can't be bound.
pub async fn new(config: Shared, visitor_store: DynVisitorStore) -> anyhow::Result<DnsServer> {
    let handler = Handler::new(Arc::new(router(&config, visitor_store)));
    let udp = UdpSocket::bind(config.dns_udp_bind_addr).await?;
    let tcp = match config.dns_tcp_bind_addr {
        Some(tcp_addr) => Some((TcpListener::bind(tcp_addr).await?, config.dns_tcp_timeout)),
        None => None,
    };
    Ok(DnsServer { handler, udp, tcp })
}

impl DnsServer {
    /// The address the UDP listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address can't be read.
    pub fn udp_local_addr(&self) -> io::Result<SocketAddr> {
        self.udp.local_addr()
    }

    /// The address the TCP listener is bound to, if one is configured.
    pub fn tcp_local_addr(&self) -> Option<io::Result<SocketAddr>> {
        self.tcp.as_ref().map(|(listener, _)| listener.local_addr())
    }

    /// Serve every listener until the task is dropped.
    pub async fn block_until_done(self) {
        let udp = serve_udp(self.handler.clone(), self.udp);
        match self.tcp {
            Some((listener, timeout)) => {
                tokio::join!(udp, serve_tcp(self.handler, listener, timeout));
            }
            None => udp.await,
        }
    }
}

async fn serve_udp(handler: Handler, socket: UdpSocket) {
    let socket = Arc::new(socket);
    let mut buf = vec![0u8; MAX_UDP_MESSAGE];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, src)) => {
                let request = buf[..len].to_vec();
                let handler = handler.clone();
                let socket = socket.clone();
                tokio::spawn(async move {
                    let Some(response) = handler.handle_bytes(&request, src.ip()).await else {
                        return;
                    };
                    if let Err(err) = socket.send_to(&response, src).await {
                        debug!("UDP send to {src} failed: {err}");
                    }
                });
            }
            Err(err) => error!("UDP receive failed: {err}"),
        }
    }
}

async fn serve_tcp(handler: Handler, listener: TcpListener, timeout: Duration) {
    loop {
        match listener.accept().await {
            Ok((stream, src)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    if let Err(err) = serve_tcp_connection(&handler, stream, src, timeout).await {
                        debug!("TCP connection from {src} closed: {err}");
                    }
                });
            }
            Err(err) => error!("TCP accept failed: {err}"),
        }
    }
}

/// Answer length-prefixed messages on `stream` until the client closes it or goes idle for
/// `timeout`.
async fn serve_tcp_connection(
    handler: &Handler,
    mut stream: TcpStream,
    src: SocketAddr,
    timeout: Duration,
) -> io::Result<()> {
    loop {
        let mut len_buf = [0u8; 2];
        match tokio::time::timeout(timeout, stream.read_exact(&mut len_buf)).await {
            Ok(Ok(_)) => {}
            // Closed or idle.
            Ok(Err(_)) | Err(_) => return Ok(()),
        }

        let mut request = vec![0u8; usize::from(u16::from_be_bytes(len_buf))];
        tokio::time::timeout(timeout, stream.read_exact(&mut request))
            .await
            .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))??;

        let Some(response) = handler.handle_bytes(&request, src.ip()).await else {
            return Ok(());
        };
        let len = u16::try_from(response.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "response too large"))?;
        stream.write_all(&len.to_be_bytes()).await?;
        stream.write_all(&response).await?;
    }
}
