fn main() {
    if let Err(e) = medscan_lib::run() {
        tracing::error!("{e}");
        eprintln!("medscan: {e}");
        std::process::exit(1);
    }
}
