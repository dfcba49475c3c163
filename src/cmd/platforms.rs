use vidpeek::PlatformId;

pub fn cmd_platforms() {
    for platform in PlatformId::ALL {
        println!("{:<12} {}", platform.as_str(), platform.display_name());
        println!("   Domains: {}", platform.domains().join(", "));
    }
}
