use colored::Colorize;
use firmware_build::TargetRegistry;

pub fn run(registry: &TargetRegistry) {
    println!();
    println!("{}", "Available targets:".cyan().bold());
    println!();

    for target in registry.targets() {
        let marker = if registry.defaults().contains(&target.name) {
            " (default)"
        } else {
            ""
        };
        println!(
            "  {} {:<14} {}{}",
            format!("{:<10}", target.name).bold(),
            target.title,
            target.description,
            marker.dimmed()
        );
    }

    println!();
    println!(
        "   {}",
        "Run with no target to build the SysEx image and report its size".dimmed()
    );
    println!();
}
