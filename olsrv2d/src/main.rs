#![forbid(unsafe_code)]

//! `olsrv2d`: the socket- and clock-facing embedder around `olsrv2_core::Daemon`.
//!
//! Follows the core crate's adapter split (spec §6): this binary owns every
//! piece of actual I/O — UDP multicast sockets, wall-clock time, logging the
//! resulting FIB diff — while all protocol logic lives in `olsrv2_core`.

use clap::Parser;
use olsrv2_core::address::{Address, AddressFamily};
use olsrv2_core::config::{self, Config};
use olsrv2_core::daemon::{Daemon, OutboundPacket};
use olsrv2_core::iface::InterfaceId;
use olsrv2_core::routing::fib::{self, FibAdapter, FibDiff, Route};
use olsrv2_core::RouteKey;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// RFC 5444-over-UDP defaults for OLSRv2 (spec §4.1 "Multicast ports and addresses").
const OLSRV2_PORT: u16 = 269;
const MULTICAST_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 109);
const MULTICAST_V6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0x6d);

#[derive(Parser, Debug)]
#[command(author, version, about = "OLSRv2 (RFC 7181) mobile ad-hoc routing daemon")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(short, long, value_name = "FILE", default_value = "olsrv2d.toml")]
    config: PathBuf,

    /// Load the configuration, run a single timer+settle pass and print the
    /// resulting FIB diff without opening any sockets. Useful for
    /// validating a config change before restarting the real daemon.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match config::load_from_path(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, path = %cli.config.display(), "failed to load configuration");
            std::process::exit(1);
        }
    };

    let originator = match first_configured_address(&config) {
        Some(addr) => addr,
        None => {
            error!("no [[interfaces]] entry carries an address to use as the originator");
            std::process::exit(1);
        }
    };
    info!(%originator, interfaces = config.interfaces.len(), domains = config.domains.len(), "configuration loaded");

    let mut daemon = Daemon::new(&config, originator);

    if cli.once {
        run_once(&mut daemon);
        return;
    }

    if let Err(err) = run(&mut daemon, &config).await {
        error!(%err, "daemon exited with error");
        std::process::exit(1);
    }
}

fn run_once(daemon: &mut Daemon) {
    let outbound = daemon.fire_timers(0);
    info!(packets = outbound.len(), "initial timer pass would produce outbound packets");
    let diff = daemon.settle();
    log_and_apply_diff(&diff);
}

/// One interface's bound multicast socket plus the destination address to
/// send to on it.
struct InterfaceSocket {
    iface: InterfaceId,
    socket: Arc<UdpSocket>,
    destination: SocketAddr,
}

struct Inbound {
    iface: InterfaceId,
    sender: Address,
    bytes: bytes::Bytes,
}

async fn run(daemon: &mut Daemon, config: &Config) -> io::Result<()> {
    let started = Instant::now();
    let (tx, mut rx) = mpsc::channel::<Inbound>(256);

    let mut sockets = Vec::new();
    for (idx, iface_cfg) in config.interfaces.iter().enumerate() {
        let iface = InterfaceId(idx as u32);
        let family = iface_cfg
            .addresses
            .first()
            .and_then(|a| a.parse::<IpAddr>().ok())
            .map(|ip| if ip.is_ipv6() { AddressFamily::Inet6 } else { AddressFamily::Inet })
            .unwrap_or(AddressFamily::Inet);
        let bind_addr = iface_cfg
            .addresses
            .iter()
            .filter_map(|a| a.parse::<Ipv4Addr>().ok())
            .next()
            .unwrap_or(Ipv4Addr::UNSPECIFIED);

        let std_socket = bind_multicast(family, bind_addr)?;
        std_socket.set_nonblocking(true)?;
        let tokio_socket = Arc::new(UdpSocket::from_std(std_socket)?);

        let destination = match family {
            AddressFamily::Inet => SocketAddr::V4(SocketAddrV4::new(MULTICAST_V4, OLSRV2_PORT)),
            AddressFamily::Inet6 => SocketAddr::V6(SocketAddrV6::new(MULTICAST_V6, OLSRV2_PORT, 0, 0)),
            _ => SocketAddr::V4(SocketAddrV4::new(MULTICAST_V4, OLSRV2_PORT)),
        };
        sockets.push(InterfaceSocket { iface, socket: tokio_socket.clone(), destination });

        let tx = tx.clone();
        let if_name = iface_cfg.name.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 65_535];
            loop {
                match tokio_socket.recv_from(&mut buf).await {
                    Ok((len, from)) => {
                        if let Some(sender) = address_from_ip(from.ip()) {
                            let bytes = bytes::Bytes::copy_from_slice(&buf[..len]);
                            if tx.send(Inbound { iface, sender, bytes }).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => warn!(%err, if_name = %if_name, "multicast recv failed"),
                }
            }
        });
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut shutdown = Box::pin(tokio::signal::ctrl_c());

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested, exiting run loop");
                return Ok(());
            }
            _ = ticker.tick() => {
                let now_ms = started.elapsed().as_millis() as u64;
                let outbound = daemon.fire_timers(now_ms);
                send_all(&sockets, outbound).await;
                log_and_apply_diff(&daemon.settle());
            }
            Some(inbound) = rx.recv() => {
                let now_ms = started.elapsed().as_millis() as u64;
                daemon.receive(inbound.iface, inbound.sender, inbound.bytes, now_ms);
                log_and_apply_diff(&daemon.settle());
            }
        }
    }
}

async fn send_all(sockets: &[InterfaceSocket], outbound: Vec<OutboundPacket>) {
    for packet in outbound {
        let Some(target) = sockets.iter().find(|s| s.iface == packet.iface) else {
            continue;
        };
        if let Err(err) = target.socket.send_to(&packet.bytes, target.destination).await {
            warn!(%err, iface = packet.iface.0, "multicast send failed");
        }
    }
}

fn bind_multicast(family: AddressFamily, v4_interface: Ipv4Addr) -> io::Result<std::net::UdpSocket> {
    match family {
        AddressFamily::Inet6 => {
            let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
            socket.set_reuse_address(true)?;
            socket.bind(&SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, OLSRV2_PORT, 0, 0)).into())?;
            // Real multi-homed routers should resolve the real ifindex for
            // this interface name; 0 (any) is good enough for a single-NIC node.
            socket.join_multicast_v6(&MULTICAST_V6, 0)?;
            Ok(socket.into())
        }
        _ => {
            let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
            socket.set_reuse_address(true)?;
            socket.bind(&SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, OLSRV2_PORT)).into())?;
            socket.join_multicast_v4(&MULTICAST_V4, &v4_interface)?;
            Ok(socket.into())
        }
    }
}

fn address_from_ip(ip: IpAddr) -> Option<Address> {
    match ip {
        IpAddr::V4(a) => Some(Address::Inet(a)),
        IpAddr::V6(a) => Some(Address::Inet6(a)),
    }
}

fn first_configured_address(config: &Config) -> Option<Address> {
    config.interfaces.iter().flat_map(|i| i.addresses.iter()).find_map(|a| a.parse::<IpAddr>().ok()).and_then(address_from_ip)
}

/// Pushes a settle's [`FibDiff`] through a [`FibAdapter`], logging each
/// change. `LoggingFib` stands in for the real kernel-routing-table adapter
/// (netlink on Linux, PF_ROUTE elsewhere) a production embedder would write;
/// picking one is a deployment decision, not something this crate can do
/// portably on the embedder's behalf.
fn log_and_apply_diff(diff: &FibDiff) {
    if diff.added.is_empty() && diff.changed.is_empty() && diff.removed.is_empty() {
        return;
    }
    let mut adapter = LoggingFib;
    let failed = fib::apply_diff(&mut adapter, diff);
    for key in &failed {
        warn!(dst = %key.dst, "FIB adapter rejected route");
    }
}

struct LoggingFib;

impl FibAdapter for LoggingFib {
    fn add_or_update(&mut self, route: &Route) -> Result<(), ()> {
        info!(dst = %route.key.dst, next_hop = %route.next_hop, iface = route.iface.0, metric = route.metric.0, "route installed");
        Ok(())
    }

    fn remove(&mut self, key: &RouteKey) {
        info!(dst = %key.dst, "route removed");
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
}
