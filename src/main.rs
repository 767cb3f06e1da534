fn main() {
    if let Err(error) = semester_planner::run() {
        eprintln!("semester-planner: {error}");
        std::process::exit(1);
    }
}
