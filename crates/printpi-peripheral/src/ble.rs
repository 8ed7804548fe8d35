//! BlueZ GATT front end.
//!
//! One primary service with four characteristics:
//!
//! | Characteristic | Access | Maps to |
//! |----------------|--------|---------|
//! | label | read | configured device label |
//! | command | write | [`ControllerHandle::select_action`] |
//! | result | notify | subscribe starts a session, stop cancels it |
//! | heartbeat | indicate | `u32` little-endian counter |

use bluer::adv::Advertisement;
use bluer::gatt::local::{
    Application, Characteristic, CharacteristicNotifier, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicRead, CharacteristicWrite,
    CharacteristicWriteMethod, ReqError, Service,
};
use futures::FutureExt;
use printpi_capture::{CaptureError, ChannelSink, ControllerHandle};
use printpi_core::config::BleConfig;
use printpi_core::constants::{
    COMMAND_CHARACTERISTIC_UUID, HEARTBEAT_CHARACTERISTIC_UUID, LABEL_CHARACTERISTIC_UUID,
    RESULT_CHARACTERISTIC_UUID, SERVICE_UUID,
};
use std::sync::Arc;
use std::time::Duration;

/// Advertise the service and serve it until Ctrl-C.
pub async fn run(config: &BleConfig, controller: ControllerHandle) -> anyhow::Result<()> {
    let session = bluer::Session::new().await?;
    let adapter = match &config.adapter {
        Some(name) => session.adapter(name)?,
        None => session.default_adapter().await?,
    };
    adapter.set_powered(true).await?;
    tracing::info!(
        adapter = adapter.name(),
        address = %adapter.address().await?,
        "Bluetooth adapter powered on"
    );

    let advertisement = Advertisement {
        service_uuids: [SERVICE_UUID].into_iter().collect(),
        discoverable: Some(true),
        local_name: Some(config.local_name.clone()),
        ..Default::default()
    };
    let _advertisement = adapter.advertise(advertisement).await?;
    tracing::info!(name = %config.local_name, service = %SERVICE_UUID, "Advertising");

    let _application = adapter
        .serve_gatt_application(application(config, controller.clone()))
        .await?;
    tracing::info!("GATT application registered");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    controller.shutdown().await?;

    Ok(())
}

fn application(config: &BleConfig, controller: ControllerHandle) -> Application {
    Application {
        services: vec![Service {
            uuid: SERVICE_UUID,
            primary: true,
            characteristics: vec![
                label_characteristic(config.device_label.clone()),
                command_characteristic(controller.clone()),
                result_characteristic(controller),
                heartbeat_characteristic(Duration::from_millis(config.heartbeat_ms)),
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn label_characteristic(label: String) -> Characteristic {
    Characteristic {
        uuid: LABEL_CHARACTERISTIC_UUID,
        read: Some(CharacteristicRead {
            read: true,
            fun: Box::new(move |_request| {
                let value = label.clone().into_bytes();
                async move { Ok(value) }.boxed()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn command_characteristic(controller: ControllerHandle) -> Characteristic {
    Characteristic {
        uuid: COMMAND_CHARACTERISTIC_UUID,
        write: Some(CharacteristicWrite {
            write: true,
            write_without_response: true,
            method: CharacteristicWriteMethod::Fun(Box::new(move |value, _request| {
                let controller = controller.clone();
                async move {
                    match controller.select_action(&value).await {
                        // Unknown codes are logged by the controller and ignored.
                        Ok(_) | Err(CaptureError::Core(_)) => Ok(()),
                        Err(e) => {
                            tracing::error!(error = %e, "Command write failed");
                            Err(ReqError::Failed)
                        }
                    }
                }
                .boxed()
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn result_characteristic(controller: ControllerHandle) -> Characteristic {
    Characteristic {
        uuid: RESULT_CHARACTERISTIC_UUID,
        notify: Some(CharacteristicNotify {
            notify: true,
            method: CharacteristicNotifyMethod::Fun(Box::new(move |notifier| {
                let controller = controller.clone();
                async move {
                    tokio::spawn(forward_session(controller, notifier));
                }
                .boxed()
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}

enum NotifyEvent {
    Stopped,
    Payload(Option<Vec<u8>>),
}

/// Run one session for one notification subscription.
async fn forward_session(controller: ControllerHandle, mut notifier: CharacteristicNotifier) {
    let (sink, mut payloads) = ChannelSink::new();
    let ticket = match controller.subscribe(Arc::new(sink)).await {
        Ok(ticket) => ticket,
        Err(e) => {
            tracing::error!(error = %e, "Could not start capture session");
            return;
        }
    };
    tracing::info!(mode = %ticket.mode(), "Client subscribed, session started");

    loop {
        let event = tokio::select! {
            biased;
            _ = notifier.stopped() => NotifyEvent::Stopped,
            payload = payloads.recv() => NotifyEvent::Payload(payload),
        };

        match event {
            NotifyEvent::Payload(Some(bytes)) => {
                if let Err(e) = notifier.notify(bytes).await {
                    tracing::warn!(error = %e, "Notification failed, cancelling session");
                    cancel(&controller).await;
                    break;
                }
            }
            NotifyEvent::Payload(None) => break,
            NotifyEvent::Stopped => {
                tracing::info!("Client unsubscribed");
                cancel(&controller).await;
                break;
            }
        }
    }
}

async fn cancel(controller: &ControllerHandle) {
    if let Err(e) = controller.unsubscribe().await {
        tracing::warn!(error = %e, "Unsubscribe failed");
    }
}

fn heartbeat_characteristic(period: Duration) -> Characteristic {
    Characteristic {
        uuid: HEARTBEAT_CHARACTERISTIC_UUID,
        notify: Some(CharacteristicNotify {
            indicate: true,
            method: CharacteristicNotifyMethod::Fun(Box::new(move |notifier| {
                async move {
                    tokio::spawn(heartbeat(notifier, period));
                }
                .boxed()
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}

async fn heartbeat(mut notifier: CharacteristicNotifier, period: Duration) {
    let mut counter: u32 = 0;
    let mut ticker = tokio::time::interval(period);

    loop {
        tokio::select! {
            biased;
            _ = notifier.stopped() => break,
            _ = ticker.tick() => {}
        }

        if let Err(e) = notifier.notify(counter.to_le_bytes().to_vec()).await {
            tracing::debug!(error = %e, "Heartbeat indication failed");
            break;
        }
        counter = counter.wrapping_add(1);
    }
}
