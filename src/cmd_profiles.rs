//! `prompto profiles`.

use prompto_engine::{PlatformProfile, ProfileRegistry};

pub(crate) fn handle_profiles(host: Option<String>) -> anyhow::Result<()> {
    let registry = ProfileRegistry::builtin();

    match host {
        Some(host) => {
            let profile = registry.resolve_or_generic(&host);
            println!("{} -> {} ({})", host, profile.id, profile.name);
            print_rules(&profile);
        }
        None => {
            for profile in registry.profiles() {
                print_profile(profile);
                println!();
            }
            print_profile(&registry.generic());
        }
    }
    Ok(())
}

fn print_profile(profile: &PlatformProfile) {
    let hosts = if profile.hosts.is_empty() {
        "(fallback)".to_string()
    } else {
        profile.hosts.join(", ")
    };
    println!("{} - {}", profile.id, profile.name);
    println!("  hosts:   {}", hosts);
    println!("  adapter: {:?}", profile.adapter);
    print_rules(profile);
}

fn print_rules(profile: &PlatformProfile) {
    for rule in profile.rules() {
        println!("  [{}] {}", rule.rank, rule.strategy);
    }
}
