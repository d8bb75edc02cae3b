use tracing::info;
use wornshot_application::infrastructure_config::{Config, RateLimitConfig};

pub fn print_api_info(config: &Config) {
    print_api_documentation_info(config);
    print_configuration_info(config);
    print_rate_limiting_info(config);
}

fn print_api_documentation_info(config: &Config) {
    let base_url = format!("http://{}", config.server_address());
    info!("📋 API Documentation:");
    info!("  📖 Swagger UI: {}/docs", base_url);
    info!("  📄 OpenAPI JSON: {}/api-docs/openapi.json", base_url);
}

fn print_configuration_info(config: &Config) {
    info!("⚙️  Configuration:");
    info!(
        "  💳 Credits: start {} | main image {} | multi-pose {}",
        config.credits.initial_credits, config.credits.main_image_cost, config.credits.multi_pose_cost
    );
    info!(
        "  ⏳ Reservations: ttl {}s, reconcile every ~{}s (batch {})",
        config.credits.reservation_ttl_secs,
        config.credits.reconcile_interval_secs,
        config.credits.reconcile_batch_size
    );
    info!("  🗄️  Storage: {:?}", config.storage.backend);
    info!("  🍪 Sessions: {:?}", config.auth.session_backend);
    info!(
        "  🖼️  Generation: {:?} ({} poses per set, timeout {}s)",
        config.generation.backend,
        config.generation.multi_pose_count,
        config.generation.timeout_secs
    );
}

fn print_rate_limiting_info(config: &Config) {
    if config.rate_limit.enabled {
        info!("  🚦 Rate Limiting: ENABLED");
        print_rate_limits(&config.rate_limit);
    } else {
        info!("  🚦 Rate Limiting: DISABLED");
    }
}

#[allow(clippy::cognitive_complexity)]
fn print_rate_limits(rate_limit: &RateLimitConfig) {
    let burst = |per_minute: u32| per_minute.saturating_mul(rate_limit.burst_size_multiplier);

    info!(
        "    • Credits: {}/min per IP (burst: {})",
        rate_limit.credits_requests_per_minute,
        burst(rate_limit.credits_requests_per_minute)
    );
    info!(
        "    • Generation: {}/min per IP (burst: {})",
        rate_limit.generation_requests_per_minute,
        burst(rate_limit.generation_requests_per_minute)
    );
    info!(
        "    • Auth: {}/min per IP (burst: {})",
        rate_limit.auth_requests_per_minute,
        burst(rate_limit.auth_requests_per_minute)
    );
    info!(
        "    • Global: {}/min per IP (burst: {})",
        rate_limit.global_requests_per_minute,
        burst(rate_limit.global_requests_per_minute)
    );
}
