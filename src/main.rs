fn main() -> anyhow::Result<()> {
    facefocus_lib::run()
}
