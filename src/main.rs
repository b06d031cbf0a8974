fn main() {
    if let Err(err) = fitlog_lib::run() {
        eprintln!("fitlog: {err:#}");
        std::process::exit(1);
    }
}
