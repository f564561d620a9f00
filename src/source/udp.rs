//! UDP packet source: unicast or multicast datagram reception
//!
//! Datagrams are split into 188-byte packets; every packet of a datagram is
//! stamped with the 27 MHz monotonic time at which the datagram arrived.

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Instant;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

use crate::constants::{TS_PACKET_SIZE, TS_SYNC_BYTE, UDP_RECV_BUFFER_SIZE};
use crate::error::{Error, Result};
use crate::packet::{PacketMetadata, TsPacket};
use crate::source::PacketSource;
use crate::types::monotonic_ticks;

pub struct UdpSource {
    addr: SocketAddr,
    socket: Option<UdpSocket>,
    opened_at: Option<Instant>,
    /// Packets of the last datagram that did not fit the caller's window.
    pending: VecDeque<(TsPacket, u64)>,
}

impl UdpSource {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            socket: None,
            opened_at: None,
            pending: VecDeque::new(),
        }
    }

    /// Join multicast / bind unicast socket helper.
    fn create_udp_socket(addr: &SocketAddr) -> Result<Socket> {
        let ip = match addr.ip() {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(_) => {
                return Err(Error::InvalidInput {
                    spec: addr.to_string(),
                    reason: "only IPv4 is supported".to_string(),
                })
            }
        };

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&(*addr).into())?;

        if ip.is_multicast() {
            let iface = Ipv4Addr::UNSPECIFIED; // default interface
            socket.join_multicast_v4(&ip, &iface)?;
        }
        Ok(socket)
    }
}

impl PacketSource for UdpSource {
    fn open(&mut self) -> Result<()> {
        let socket = Self::create_udp_socket(&self.addr).map_err(|e| match e {
            Error::Io(source) => Error::SourceOpen {
                name: format!("udp://{}", self.addr),
                source,
            },
            other => other,
        })?;
        self.socket = Some(socket.into());
        self.opened_at = Some(Instant::now());
        debug!(addr = %self.addr, "udp socket bound");
        Ok(())
    }

    fn receive(
        &mut self,
        packets: &mut [TsPacket],
        metadata: &mut [PacketMetadata],
    ) -> Result<usize> {
        let Some(socket) = self.socket.as_ref() else {
            return Ok(0);
        };
        let Some(opened_at) = self.opened_at else {
            return Ok(0);
        };

        let mut filled = 0;
        while filled < packets.len() {
            if let Some((pkt, ticks)) = self.pending.pop_front() {
                packets[filled] = pkt;
                metadata[filled].set_input_timestamp(ticks);
                filled += 1;
                continue;
            }
            if filled > 0 {
                break; // deliver what we have rather than blocking again
            }

            let mut buf = [0u8; UDP_RECV_BUFFER_SIZE];
            let n = socket.recv(&mut buf)?;
            let ticks = monotonic_ticks(opened_at);
            if n == 0 {
                continue;
            }
            // iterate TS packets (188 B aligned)
            for chunk in buf[..n].chunks_exact(TS_PACKET_SIZE) {
                if chunk[0] != TS_SYNC_BYTE {
                    continue; // bad sync
                }
                let mut data = [0u8; TS_PACKET_SIZE];
                data.copy_from_slice(chunk);
                self.pending.push_back((TsPacket::new(data), ticks));
            }
        }
        Ok(filled)
    }

    fn name(&self) -> String {
        format!("udp://{}", self.addr)
    }
}
