fn main() {
    choice_cli::cli::run();
}
