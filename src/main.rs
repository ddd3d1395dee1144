fn main() {
    if let Err(err) = contact_ledger_lib::run() {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
