//! Mail relay capability check for completion notifications.

use std::{
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use tracing::debug;

/// Whether completion e-mail can be delivered from this host.
pub trait MailRelay: Send + Sync {
    fn is_available(&self) -> bool;
}

/// Probes an SMTP relay by opening a TCP connection to it.
#[derive(Debug, Clone)]
pub struct SmtpProbe {
    pub addr: String,
    pub timeout: Duration,
}

impl Default for SmtpProbe {
    fn default() -> Self {
        Self {
            addr: "localhost:25".to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

impl MailRelay for SmtpProbe {
    fn is_available(&self) -> bool {
        let addrs = match self.addr.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                debug!(target: "wfrun.core.mail", addr = %self.addr, error = %e, "cannot resolve mail relay");
                return false;
            }
        };
        for addr in addrs {
            if TcpStream::connect_timeout(&addr, self.timeout).is_ok() {
                debug!(target: "wfrun.core.mail", %addr, "mail relay reachable");
                return true;
            }
        }
        debug!(target: "wfrun.core.mail", addr = %self.addr, "no mail relay");
        false
    }
}

/// Fixed answer, for tests and for hosts where probing is undesirable.
#[derive(Debug, Clone, Copy)]
pub struct StaticRelay(pub bool);

impl MailRelay for StaticRelay {
    fn is_available(&self) -> bool {
        self.0
    }
}
