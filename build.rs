use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Drop a config template next to the build output
    let out_dir = env::var("OUT_DIR").unwrap_or_else(|_| "./".to_string());
    let template_path = Path::new(&out_dir).join("../../../tsio.template.toml");

    let template = r#"# TSIO Configuration Template
# Copy this file to 'tsio.toml' next to your binary's working directory.

# Multicast receive timeout in milliseconds, 0 blocks forever
rx_timeout_ms = 30000

# Kernel receive buffer for multicast sockets, in bytes
rx_socket_buffer = 10485760

# File transmit buffer, in TS packets
file_tx_buffer_packets = 100

# File transmit wrap-around limit, in MiB (minimum 100)
file_tx_limit_mib = 100

# Multicast transmit buffer, in 7-packet datagrams
multicast_tx_frames = 10

# TTL of outgoing multicast datagrams
multicast_ttl = 1
"#;

    let _ = fs::write(template_path, template);
    println!("cargo:rerun-if-changed=build.rs");
}
