fn main() {
    if let Err(err) = census_etl::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
