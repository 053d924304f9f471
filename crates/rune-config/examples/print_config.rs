/// Example program to print the loaded configuration
///
/// Run with: cargo run -p rune-config --example print_config

fn main() {
    // Load configuration from motion.toml
    let config = rune_config::MotionConfig::load();

    println!("=== Rune Motion Configuration ===\n");

    println!("Engine Settings:");
    println!("  Precision: {}", config.engine.precision);
    println!("  Default Setter: {:?}", config.engine.default_setter);
    println!();

    println!("Timing Defaults:");
    println!("  Duration: {:?}", config.timing.duration);
    println!("  Delay: {:?}", config.timing.delay);
    println!("  Iterations: {:?}", config.timing.iterations);
    println!("  Direction: {:?}", config.timing.direction);
    println!("  Fill: {:?}", config.timing.fill);
    println!("  Easing: {:?}", config.timing.easing);
    println!();

    println!("Driver Settings:");
    println!("  Target: {}", config.driver.target);
    println!("  Frame Interval: {} ms", config.driver.frame_interval_ms);
    println!("  Max Frames: {}", config.driver.max_frames);
    println!("  Playback Rate: {}", config.driver.playback_rate);
    println!("  Keyframes: {}", config.driver.keyframes);
    println!();

    match toml::to_string_pretty(&config) {
        Ok(toml_str) => {
            println!("=== Serialized Configuration ===");
            println!("{}", toml_str);
        }
        Err(e) => {
            eprintln!("Failed to serialize config: {}", e);
        }
    }
}
