fn main() -> anyhow::Result<()> {
    solvegraph_cli::cli::run()
}
