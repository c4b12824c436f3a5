//! Shared fixtures for pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use socket_autodiscover::{ModuleCatalog, ModuleDefinition, StaticCatalog};
use socket_monitor::{Monitor, Protocol, ShutdownSignal, SocketTransition, TcpState};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

/// A transition of a socket owned by `comm`/`pid` on 127.0.0.1:`port`
pub fn transition(
    comm: &str,
    pid: u32,
    port: u16,
    old_state: TcpState,
    new_state: TcpState,
) -> SocketTransition {
    SocketTransition {
        pid,
        comm: comm.to_string(),
        protocol: Protocol::Tcp,
        src_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
        src_port: port,
        dst_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        dst_port: 0,
        old_state,
        new_state,
    }
}

/// CLOSE -> LISTEN
pub fn listen(comm: &str, pid: u32, port: u16) -> SocketTransition {
    transition(comm, pid, port, TcpState::Close, TcpState::Listen)
}

/// LISTEN -> CLOSE
pub fn unlisten(comm: &str, pid: u32, port: u16) -> SocketTransition {
    transition(comm, pid, port, TcpState::Listen, TcpState::Close)
}

/// Catalog with a handful of common modules
pub fn catalog() -> Arc<dyn ModuleCatalog> {
    Arc::new(
        StaticCatalog::new()
            .with_module("nginx", ModuleDefinition::with_defaults(["stubstatus"]))
            .with_module("redis", ModuleDefinition::with_defaults(["info", "keyspace"]))
            .with_module("postgresql", ModuleDefinition::with_defaults(["activity", "database"])),
    )
}

/// A monitor whose capture layer can never be attached
pub struct BrokenMonitor;

#[async_trait]
impl Monitor for BrokenMonitor {
    async fn start(
        &self,
        _done: ShutdownSignal,
    ) -> socket_monitor::Result<async_channel::Receiver<SocketTransition>> {
        Err(socket_monitor::Error::unavailable(
            "missing CAP_BPF to attach inet_sock_set_state probe",
        ))
    }
}
