fn main() {
    if let Err(e) = citegraph::run() {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}
