// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

//! Socket.IO client over a WebSocket on an embassy-net TCP connection.
//!
//! The sampling loop never writes to the socket. It queues Engine.IO text packets on an
//! [`OutboundChannel`], and this task frames and sends them alongside the reads. Everything the
//! server says is answered here (open, ping, close) or turned into a [`LinkEvent`].

use core::net::{IpAddr, SocketAddr};
use edge_http::io::client::Connection;
use edge_http::ws::{MAX_BASE64_KEY_LEN, MAX_BASE64_KEY_RESPONSE_LEN, NONCE_LEN};
use edge_nal::{AddrType, Dns as _, TcpConnect, TcpShutdown, TcpSplit, WithTimeout};
use edge_nal_embassy::{Dns, Tcp, TcpBuffers};
use edge_ws::{FrameHeader, FrameType};
use embassy_futures::select::{Either, select};
use embassy_net::Stack;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
use embassy_sync::channel::{Channel, Sender};
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer, with_timeout};
use embedded_io_async::{Read, Write};
use esp_hal::rng::Rng;
use log::{debug, info, trace, warn};
use scalelink_core::config::BusConfig;
use scalelink_core::transport::message_bus::FrameWriter;
use scalelink_core::transport::{LinkEvent, LinkEventSender, ServerMessageKind, trace_hexdump};
use scalelink_messages::engine_io::{self, DecodeError, EnginePacket, SocketPacketType};

pub const FRAME_CAPACITY: usize = 256;
const OUTBOUND_DEPTH: usize = 4;

pub type OutboundFrame = heapless::String<FRAME_CAPACITY>;
pub type OutboundChannel = Channel<CriticalSectionRawMutex, OutboundFrame, OUTBOUND_DEPTH>;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
/// Longer than the server's ping interval, a silent server counts as gone.
const SOCKET_TIMEOUT_MS: u32 = 60_000;
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);
const TCP_BUFFER: usize = 1536;
/// Holds the HTTP upgrade exchange, then each received frame payload.
const CONNECTION_BUFFER: usize = 1024;

type TcpStack<'d> = WithTimeout<Tcp<'d, 1, TCP_BUFFER, TCP_BUFFER>>;
type TcpError = <TcpStack<'static> as TcpConnect>::Error;
type SharedWriter<W> = Mutex<NoopRawMutex, W>;

#[derive(Debug)]
pub enum WriteError {
    FrameTooLong(usize),
    QueueFull,
}

/// [`FrameWriter`] half of the outbound queue, handed to the sampling loop's sink.
pub struct ChannelFrameWriter {
    sender: Sender<'static, CriticalSectionRawMutex, OutboundFrame, OUTBOUND_DEPTH>,
}

impl ChannelFrameWriter {
    pub fn new(channel: &'static OutboundChannel) -> Self {
        Self {
            sender: channel.sender(),
        }
    }
}

impl FrameWriter for ChannelFrameWriter {
    type Error = WriteError;

    async fn write_text(&mut self, frame: &str) -> Result<(), WriteError> {
        let frame = OutboundFrame::try_from(frame).map_err(|_| WriteError::FrameTooLong(frame.len()))?;
        self.sender.try_send(frame).map_err(|_| WriteError::QueueFull)
    }
}

/// Waits for the queue to empty so a leave sent just before deep sleep reaches the server.
pub async fn flush(channel: &OutboundChannel) {
    let drained = async {
        while !channel.is_empty() {
            Timer::after_millis(20).await;
        }
        // let the last frame leave the TCP buffer
        Timer::after_millis(200).await;
    };
    if with_timeout(FLUSH_TIMEOUT, drained).await.is_err() {
        warn!("Outbound frames still queued at shutdown");
    }
}

#[derive(Debug)]
enum SessionError<E> {
    Http(edge_http::io::Error<E>),
    WebSocket(edge_ws::Error<E>),
    Packet(DecodeError),
    UpgradeRejected,
}

impl<E> From<edge_http::io::Error<E>> for SessionError<E> {
    fn from(e: edge_http::io::Error<E>) -> Self {
        SessionError::Http(e)
    }
}

impl<E> From<edge_ws::Error<E>> for SessionError<E> {
    fn from(e: edge_ws::Error<E>) -> Self {
        SessionError::WebSocket(e)
    }
}

impl<E> From<DecodeError> for SessionError<E> {
    fn from(e: DecodeError) -> Self {
        SessionError::Packet(e)
    }
}

#[embassy_executor::task]
pub async fn session_task(
    stack: Stack<'static>,
    bus: BusConfig,
    link_events: LinkEventSender<'static>,
    outbound: &'static OutboundChannel,
) {
    let buffers = TcpBuffers::<1, TCP_BUFFER, TCP_BUFFER>::new();
    let tcp = WithTimeout::new(SOCKET_TIMEOUT_MS, Tcp::new(stack, &buffers));
    let mut connection_buffer = [0u8; CONNECTION_BUFFER];

    loop {
        stack.wait_config_up().await;

        if let Some(address) = resolve(stack, bus.host).await {
            let mut session = Session {
                bus: &bus,
                link_events,
                opened: false,
            };
            let remote = SocketAddr::new(address, bus.port);
            match session.run(&tcp, remote, &mut connection_buffer, outbound).await {
                Ok(()) => info!("Server closed the session"),
                Err(e) => warn!("Session with {}:{} ended: {:?}", bus.host, bus.port, e),
            }
            if session.opened {
                link_events.send(LinkEvent::SessionClosed).await;
            }
        }

        Timer::after(RECONNECT_DELAY).await;
    }
}

async fn resolve(stack: Stack<'_>, host: &str) -> Option<IpAddr> {
    if let Ok(address) = host.parse::<IpAddr>() {
        return Some(address);
    }
    match Dns::new(stack).get_host_by_name(host, AddrType::IPv4).await {
        Ok(address) => Some(address),
        Err(e) => {
            warn!("Cannot resolve {}: {:?}", host, e);
            None
        }
    }
}

/// Sends one masked frame and flushes it.
async fn send_frame<W: Write>(
    writer: &SharedWriter<W>,
    frame_type: FrameType,
    payload: &[u8],
) -> Result<(), edge_ws::Error<W::Error>> {
    let header = FrameHeader {
        frame_type,
        payload_len: payload.len() as u64,
        mask_key: Some(Rng::new().random()),
    };
    let mut writer = writer.lock().await;
    header.send(&mut *writer).await?;
    header.send_payload(&mut *writer, payload).await?;
    writer.flush().await.map_err(edge_ws::Error::Io)
}

/// Forwards queued Engine.IO packets until the connection fails.
async fn forward_outbound<W: Write>(
    outbound: &OutboundChannel,
    writer: &SharedWriter<W>,
) -> Result<(), SessionError<W::Error>> {
    loop {
        let frame = outbound.receive().await;
        send_frame(writer, FrameType::Text(false), frame.as_bytes()).await?;
    }
}

struct Session<'a> {
    bus: &'a BusConfig,
    link_events: LinkEventSender<'static>,
    /// The namespace CONNECT has been acknowledged
    opened: bool,
}

impl Session<'_> {
    async fn run(
        &mut self,
        tcp: &TcpStack<'_>,
        remote: SocketAddr,
        buffer: &mut [u8],
        outbound: &OutboundChannel,
    ) -> Result<(), SessionError<TcpError>> {
        let mut conn: Connection<'_, _> = Connection::new(buffer, tcp, remote);

        let mut nonce = [0u8; NONCE_LEN];
        let rng = Rng::new();
        for word in nonce.chunks_mut(4) {
            word.copy_from_slice(&rng.random().to_le_bytes());
        }
        let mut nonce_base64 = [0u8; MAX_BASE64_KEY_LEN];
        conn.initiate_ws_upgrade_request(Some(self.bus.host), None, self.bus.path, None, &nonce, &mut nonce_base64)
            .await?;
        conn.initiate_response().await?;

        let mut accept = [0u8; MAX_BASE64_KEY_RESPONSE_LEN];
        if !conn.is_ws_upgrade_accepted(&nonce, &mut accept)? {
            return Err(SessionError::UpgradeRejected);
        }
        conn.complete().await?;
        info!("Connected to {}:{}", self.bus.host, self.bus.port);

        let (mut socket, buffer) = conn.release();
        let result = self.exchange(&mut socket, buffer, outbound).await;
        if let Err(e) = socket.abort().await {
            debug!("Socket abort failed: {:?}", e);
        }
        result
    }

    async fn exchange<S: TcpSplit>(
        &mut self,
        socket: &mut S,
        buffer: &mut [u8],
        outbound: &OutboundChannel,
    ) -> Result<(), SessionError<S::Error>> {
        let (mut reader, writer) = socket.split();
        let writer = SharedWriter::new(writer);

        // frames queued while the bus was down belong to an older session
        outbound.clear();

        match select(
            self.read_frames(&mut reader, buffer, &writer),
            forward_outbound(outbound, &writer),
        )
        .await
        {
            Either::First(result) | Either::Second(result) => result,
        }
    }

    /// Handles server frames until the server closes.
    async fn read_frames<R: Read, W: Write<Error = R::Error>>(
        &mut self,
        reader: &mut R,
        buffer: &mut [u8],
        writer: &SharedWriter<W>,
    ) -> Result<(), SessionError<R::Error>> {
        loop {
            let header = FrameHeader::recv(&mut *reader).await?;
            let payload = header.recv_payload(&mut *reader, buffer).await?;

            if !header.frame_type.is_final() {
                debug!("Ignoring fragmented frame");
                continue;
            }
            match header.frame_type {
                FrameType::Text(_) => match core::str::from_utf8(payload) {
                    Ok(text) => {
                        if self.handle_packet(text, writer).await? {
                            return Ok(());
                        }
                    }
                    Err(_) => warn!("Text frame is not UTF-8"),
                },
                FrameType::Binary(_) => {
                    trace_hexdump("Binary frame", payload);
                    self.report(ServerMessageKind::Binary);
                }
                FrameType::Ping => send_frame(writer, FrameType::Pong, payload).await?,
                FrameType::Close => {
                    send_frame(writer, FrameType::Close, &[]).await?;
                    return Ok(());
                }
                FrameType::Pong | FrameType::Continue(_) => {}
            }
        }
    }

    /// Returns true when the packet ends the session.
    async fn handle_packet<W: Write>(
        &mut self,
        text: &str,
        writer: &SharedWriter<W>,
    ) -> Result<bool, SessionError<W::Error>> {
        trace!("<- {}", text);
        match engine_io::decode(text)? {
            EnginePacket::Open(data) => {
                match engine_io::parse_open(data) {
                    Ok(open) => info!(
                        "Engine.IO session {} (ping interval {} ms)",
                        open.sid, open.ping_interval
                    ),
                    Err(e) => warn!("Unreadable open packet: {:?}", e),
                }
                let connect = engine_io::encode_connect(self.bus.namespace);
                send_frame(writer, FrameType::Text(false), connect.as_bytes()).await?;
            }
            EnginePacket::Ping(data) => {
                let pong = engine_io::encode_pong(data);
                send_frame(writer, FrameType::Text(false), pong.as_bytes()).await?;
            }
            EnginePacket::Close => return Ok(true),
            EnginePacket::Message(packet) => match packet.kind {
                SocketPacketType::Connect => {
                    if !self.opened {
                        self.opened = true;
                        self.link_events.send(LinkEvent::SessionOpened).await;
                    }
                }
                SocketPacketType::Disconnect => return Ok(true),
                SocketPacketType::Event => {
                    debug!("Server event on {}: {}", packet.namespace, packet.data);
                    self.report(ServerMessageKind::Event);
                }
                SocketPacketType::Ack | SocketPacketType::BinaryAck => {
                    trace_hexdump("Ack", packet.data.as_bytes());
                    self.report(ServerMessageKind::Ack);
                }
                SocketPacketType::ConnectError => {
                    warn!("Server refused {}: {}", packet.namespace, packet.data);
                    self.report(ServerMessageKind::Error);
                }
                SocketPacketType::BinaryEvent => {
                    trace_hexdump("Binary event", packet.data.as_bytes());
                    self.report(ServerMessageKind::Binary);
                }
            },
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
        }
        Ok(false)
    }

    fn report(&self, kind: ServerMessageKind) {
        if self.link_events.try_send(LinkEvent::ServerMessage(kind)).is_err() {
            debug!("Link event queue full, dropping {:?}", kind);
        }
    }
}
