fn main() -> std::io::Result<()> {
    graded_cli::main()
}
