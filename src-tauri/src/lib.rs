mod commands;
mod error;
mod models;
mod services;

use services::acquirer::DialogAcquirer;
use services::permission::HostPermissions;
use services::predictor::PredictionClient;
use services::session::SessionController;
use std::sync::Arc;
use tauri::{Emitter, Manager};

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let app_data_dir = app
                .path()
                .app_data_dir()
                .expect("Failed to get app data directory");

            if !app_data_dir.exists() {
                std::fs::create_dir_all(&app_data_dir).expect("Failed to create app data directory");
            }

            let acquirer = DialogAcquirer::new(app.handle().clone(), app_data_dir.join("captures"));
            let client = PredictionClient::new(None);
            eprintln!("[session] prediction endpoint: {}", client.endpoint());

            let app_handle = app.handle().clone();
            let session =
                SessionController::new(Arc::new(HostPermissions), Arc::new(acquirer), client)
                    .with_listener(move |state| {
                        let _ = app_handle.emit("view-state", state);
                    });
            app.manage(session);

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::session::capture_image,
            commands::session::clear_session,
            commands::session::get_view_state,
            commands::session::check_endpoint,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
