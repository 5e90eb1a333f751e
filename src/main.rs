fn main() -> anyhow::Result<()> {
    doorbox::run(doorbox::DemoConfig::default())
}
