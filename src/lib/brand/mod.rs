use std::net::SocketAddrV4;

use crate::network::Transport;

pub mod navico;

///
/// Sends one datagram, best effort. A failed send is logged and otherwise
/// ignored: the next period simply sends again.
///
pub(crate) async fn send_packet(
    transport: &dyn Transport,
    key: &str,
    message: &[u8],
    addr: &SocketAddrV4,
) -> bool {
    match transport.send_to(message, addr).await {
        Ok(_) => {
            log::trace!("{}: sent {} bytes to {}", key, message.len(), addr);
            true
        }
        Err(e) => {
            log::warn!("{}: send to {} failed: {}", key, addr, e);
            false
        }
    }
}
