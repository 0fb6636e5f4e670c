//! BitChart - GPU-accelerated candlestick chart engine.

use anyhow::Result;
use winit::event_loop::EventLoop;

use bitchart_chart::app::App;
use bitchart_config::Config;

fn run() -> Result<()> {
    env_logger::init();

    let config = Config::load_default();

    // The feed task and the compute bridge pump run on this runtime; the
    // winit loop stays on the main thread.
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
    }
}
