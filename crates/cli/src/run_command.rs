use std::sync::Arc;

use {
    anyhow::Context,
    satele_channels::{BridgeStatus, SessionSlot, Whitelist},
    satele_config::BridgeConfig,
    satele_gateway::{GatewayState, bind_gateway, start_gateway},
    satele_whatsapp::{
        AdmissionFilter, Bridge, CredentialStore, Lifecycle, MediaDownloader, Pipeline,
        SidecarConnector, SidecarLaunch, SidecarProcess, Trigger, TriggerRouter, WebhookBackend,
        find_sidecar_dir,
    },
    tokio::task::JoinError,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

/// Run the bridge and the send API until Ctrl-C.
pub async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    for dir in [&config.auth_dir, &config.media_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let whitelist = Whitelist::new(&config.allowed_numbers);
    if whitelist.is_empty() {
        warn!("no allowed numbers configured, only your own messages will be handled");
    }
    info!(
        trigger = %config.trigger,
        allowed = whitelist.len(),
        webhook = %config.webhook_url,
        "bridge configured"
    );

    let listener = bind_gateway(&config.gateway.bind, config.gateway.port).await?;

    let mut sidecar = if config.sidecar.auto_start {
        let dir = find_sidecar_dir(config.sidecar.dir.as_deref(), |key| std::env::var(key).ok())?;
        let launch = SidecarLaunch {
            dir,
            port: config.sidecar.port,
            auth_dir: std::path::absolute(&config.auth_dir)?,
        };
        Some(SidecarProcess::start(&launch).await?)
    } else {
        None
    };

    let slot = SessionSlot::new();
    let status = BridgeStatus::new();

    let backend = WebhookBackend::new(config.webhook_url.as_str(), config.webhook_timeout())?;
    let pipeline = Pipeline::new(
        AdmissionFilter::new(whitelist),
        MediaDownloader::new(&config.media_dir, config.media_timeout()),
        TriggerRouter::new(Trigger::new(&config.trigger)?, Arc::new(backend)),
    );
    let bridge = Bridge::new(
        Arc::new(SidecarConnector::new(
            config.sidecar.url(),
            config.sidecar.send_timeout(),
        )),
        CredentialStore::new(&config.auth_dir),
        pipeline,
        slot.clone(),
        Lifecycle::new(status.clone(), config.reconnect_delay()),
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
                return;
            }
            info!("shutdown requested");
            cancel.cancel();
        }
    });

    let mut gateway = tokio::spawn({
        let shutdown = cancel.clone();
        async move {
            start_gateway(listener, GatewayState::new(slot, status), async move {
                shutdown.cancelled().await;
            })
            .await
        }
    });

    // The bridge and the send API live and die together.
    let mut gateway_result = None;
    let bridge_run = bridge.run(cancel.clone());
    tokio::pin!(bridge_run);
    let bridge_result = loop {
        tokio::select! {
            result = &mut bridge_run => break result,
            joined = &mut gateway, if gateway_result.is_none() => {
                gateway_result = Some(gateway_stopped(joined));
                cancel.cancel();
            },
        }
    };

    match &bridge_result {
        Ok(()) if !cancel.is_cancelled() => {
            warn!("bridge halted, send API stays up until shutdown");
            tokio::select! {
                () = cancel.cancelled() => {},
                joined = &mut gateway => gateway_result = Some(gateway_stopped(joined)),
            }
        },
        Ok(()) => {},
        Err(e) => error!(error = %e, "bridge failed"),
    }
    cancel.cancel();

    let gateway_result = match gateway_result {
        Some(result) => result,
        None => gateway_stopped(gateway.await),
    };

    if let Some(sidecar) = sidecar.as_mut() {
        sidecar.stop().await;
    }

    bridge_result?;
    gateway_result
}

fn gateway_stopped(joined: Result<anyhow::Result<()>, JoinError>) -> anyhow::Result<()> {
    let result = match joined {
        Ok(result) => result,
        Err(e) => Err(anyhow::Error::new(e).context("gateway task panicked")),
    };
    if let Err(e) = &result {
        error!(error = %e, "send API stopped");
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gateway_failure_is_reported() {
        let failed = tokio::spawn(async { Err::<(), _>(anyhow::anyhow!("address in use")) });
        let err = gateway_stopped(failed.await).unwrap_err();
        assert!(err.to_string().contains("address in use"));

        let clean = tokio::spawn(async { Ok::<(), anyhow::Error>(()) });
        assert!(gateway_stopped(clean.await).is_ok());
    }
}
