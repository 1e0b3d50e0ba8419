//! Process-wide access to the transfer service.
//!
//! The service handle is created lazily by a connector and cached. Every
//! access checks the cached handle with [`TransferService::is_alive`] and
//! reconnects when it has gone stale.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::{debug, info};

use crate::error::{Result, TransferError};
use crate::service::{ServiceResult, TransferService};

type Connector = Box<dyn Fn() -> ServiceResult<Arc<dyn TransferService>> + Send + Sync>;

static GLOBAL: OnceLock<Arc<ServiceManager>> = OnceLock::new();

/// Lazily connected, self-healing transfer service handle.
pub struct ServiceManager {
    connector: Connector,
    cached: Mutex<Option<Arc<dyn TransferService>>>,
}

impl ServiceManager {
    pub fn new<F>(connector: F) -> Self
    where
        F: Fn() -> ServiceResult<Arc<dyn TransferService>> + Send + Sync + 'static,
    {
        Self {
            connector: Box::new(connector),
            cached: Mutex::new(None),
        }
    }

    /// Returns the cached service, connecting first if there is none or
    /// the cached one failed its liveness check.
    pub fn service(&self) -> Result<Arc<dyn TransferService>> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(service) = cached.as_ref()
            && service.is_alive()
        {
            return Ok(Arc::clone(service));
        }
        if cached.take().is_some() {
            info!("transfer service handle went stale, reconnecting");
        }

        let service = (self.connector)().map_err(TransferError::service)?;
        *cached = Some(Arc::clone(&service));
        debug!("connected to transfer service");
        Ok(service)
    }

    /// Drops the cached handle; the next access reconnects.
    pub fn invalidate(&self) {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_connected(&self) -> bool {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Installs the process-wide manager. Returns `false` if one was
    /// already installed; the existing one is kept.
    pub fn install_global<F>(connector: F) -> bool
    where
        F: Fn() -> ServiceResult<Arc<dyn TransferService>> + Send + Sync + 'static,
    {
        GLOBAL.set(Arc::new(Self::new(connector))).is_ok()
    }

    /// Returns the process-wide manager.
    pub fn global() -> Result<Arc<ServiceManager>> {
        GLOBAL.get().cloned().ok_or(TransferError::NoService)
    }
}
