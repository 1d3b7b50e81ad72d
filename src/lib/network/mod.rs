use async_trait::async_trait;
use network_interface::{NetworkInterface, NetworkInterfaceConfig};
use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, Type};
use std::fmt;
use std::net::SocketAddrV4;
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};
use tokio::net::UdpSocket;

use crate::radar::RadarError;

// This is like a SocketAddrV4 but with known layout
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct NetworkSocketAddrV4 {
    addr: [u8; 4],
    port: [u8; 2],
}

impl From<SocketAddrV4> for NetworkSocketAddrV4 {
    fn from(item: SocketAddrV4) -> Self {
        NetworkSocketAddrV4 {
            addr: item.ip().octets(),
            port: item.port().to_be_bytes(),
        }
    }
}

impl From<NetworkSocketAddrV4> for SocketAddrV4 {
    fn from(item: NetworkSocketAddrV4) -> Self {
        SocketAddrV4::new(
            u32::from_be_bytes(item.addr).into(),
            u16::from_be_bytes(item.port),
        )
    }
}

impl std::fmt::Display for NetworkSocketAddrV4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            Ipv4Addr::from(u32::from_be_bytes(self.addr)),
            u16::from_be_bytes(self.port)
        )
    }
}

impl fmt::Debug for NetworkSocketAddrV4 {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("NetworkSocketAddrV4")
            .field("addr", &self.addr)
            .field("port", &format_args!("{}", u16::from_be_bytes(self.port)))
            .finish()
    }
}

///
/// Anything that can put a datagram on the wire. The emulator only ever sends;
/// group membership, TTL and the outgoing interface are fixed when the
/// transport is created.
///
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_to(&self, message: &[u8], addr: &SocketAddrV4) -> io::Result<usize>;
}

// this will be common for all our sockets
pub fn new_socket() -> io::Result<socket2::Socket> {
    let socket = socket2::Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    // tokio needs the socket to be non-blocking
    socket.set_nonblocking(true)?;
    socket.set_reuse_address(true)?;

    Ok(socket)
}

/// Creates a socket that sends multicast datagrams out of the NIC with address
/// `nic_addr`, with the given multicast TTL. The socket is not connected, so one
/// socket serves every destination group.
pub fn create_multicast_send(nic_addr: &Ipv4Addr, ttl: u32) -> io::Result<UdpSocket> {
    let socket: socket2::Socket = new_socket()?;

    socket.set_multicast_ttl_v4(ttl)?;
    socket.set_multicast_if_v4(nic_addr)?;

    let socketaddr_nic = SocketAddr::new(IpAddr::V4(*nic_addr), 0);
    socket.bind(&socket2::SockAddr::from(socketaddr_nic))?;
    log::trace!("Binding multicast send socket to {} ttl {}", socketaddr_nic, ttl);

    let socket = UdpSocket::from_std(socket.into())?;
    Ok(socket)
}

pub struct MulticastTransport {
    nic_addr: Ipv4Addr,
    sock: UdpSocket,
}

impl MulticastTransport {
    pub fn new(nic_addr: &Ipv4Addr, ttl: u32) -> Result<Self, RadarError> {
        match create_multicast_send(nic_addr, ttl) {
            Ok(sock) => {
                log::debug!("via {}: sending multicast, ttl {}", nic_addr, ttl);
                Ok(MulticastTransport {
                    nic_addr: *nic_addr,
                    sock,
                })
            }
            Err(e) => {
                log::debug!("via {}: create multicast failed: {}", nic_addr, e);
                Err(RadarError::Io(e))
            }
        }
    }

    pub fn nic_addr(&self) -> &Ipv4Addr {
        &self.nic_addr
    }
}

#[async_trait]
impl Transport for MulticastTransport {
    async fn send_to(&self, message: &[u8], addr: &SocketAddrV4) -> io::Result<usize> {
        self.sock.send_to(message, SocketAddr::V4(*addr)).await
    }
}

/// Finds the first IPv4 address of the interface called `name`.
pub fn find_interface_address(name: &str) -> Result<Ipv4Addr, RadarError> {
    let interfaces = NetworkInterface::show().map_err(|e| {
        log::error!("getifaddrs() failed: {}", e);
        RadarError::EnumerationFailed
    })?;

    let itf = interfaces
        .into_iter()
        .find(|itf| itf.name == name)
        .ok_or_else(|| RadarError::InterfaceNotFound(name.to_owned()))?;
    log::trace!("Interface {:?}", itf);

    itf.addr
        .iter()
        .find_map(|nic_addr| match nic_addr.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| RadarError::InterfaceNoV4(name.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_socket_addr_is_big_endian() {
        let addr = SocketAddrV4::new(Ipv4Addr::new(236, 6, 7, 9), 6679);
        let network: NetworkSocketAddrV4 = addr.into();

        let bytes = bincode::serialize(&network).unwrap();
        assert_eq!(bytes, vec![236, 6, 7, 9, 0x1a, 0x17]);
        assert_eq!(SocketAddrV4::from(network), addr);
        assert_eq!(network.to_string(), "236.6.7.9:6679");
    }

    #[tokio::test]
    async fn multicast_transport_delivers_on_loopback() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let destination = match receiver.local_addr().unwrap() {
            SocketAddr::V4(a) => a,
            SocketAddr::V6(_) => unreachable!(),
        };

        let transport = MulticastTransport::new(&Ipv4Addr::LOCALHOST, 1).unwrap();
        let sent = transport.send_to(&[0x01, 0xc4, 0x02], &destination).await.unwrap();
        assert_eq!(sent, 3);

        let mut buf = [0u8; 16];
        let (len, from) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &[0x01, 0xc4, 0x02]);
        assert_eq!(from.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn unknown_interface_is_reported() {
        assert!(matches!(
            find_interface_address("no-such-nic-42"),
            Err(RadarError::InterfaceNotFound(_)) | Err(RadarError::EnumerationFailed)
        ));
    }
}
