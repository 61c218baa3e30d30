//! Process-wide host state: the shared engine and the client registry.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Context;
use once_cell::unsync::OnceCell;

use crate::engine::ConversionEngine;
use crate::presentation::PresentationSink;
use crate::registry::SessionRegistry;
use crate::session::Session;
use crate::Config;

type EngineFactory<E> = Box<dyn Fn() -> anyhow::Result<E>>;

/// Owns the configuration, the lazily built engine and the registry shared
/// by every session the host creates.
///
/// The engine is brought up on first use. A failed bring-up is returned to
/// the caller and retried on the next request.
pub struct SessionHost<E> {
    config: Config,
    factory: EngineFactory<E>,
    engine: OnceCell<Arc<E>>,
    registry: Rc<RefCell<SessionRegistry>>,
}

impl<E: ConversionEngine> SessionHost<E> {
    pub fn new(config: Config, factory: impl Fn() -> anyhow::Result<E> + 'static) -> Self {
        let registry = SessionRegistry::new(config.registry_capacity());
        Self {
            config,
            factory: Box::new(factory),
            engine: OnceCell::new(),
            registry: Rc::new(RefCell::new(registry)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> Rc<RefCell<SessionRegistry>> {
        Rc::clone(&self.registry)
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.get().is_some()
    }

    /// The shared engine, building it on first call.
    pub fn engine(&self) -> anyhow::Result<Arc<E>> {
        self.engine
            .get_or_try_init(|| self.bring_up())
            .map(Arc::clone)
    }

    fn bring_up(&self) -> anyhow::Result<Arc<E>> {
        tracing::info!("initializing shared conversion engine");
        let mut engine = (self.factory)().context("failed to construct conversion engine")?;

        if let Some(path) = self.config.dictionary_path() {
            engine
                .load_dictionary(&path)
                .with_context(|| format!("failed to load dictionary {}", path.display()))?;
            tracing::info!(path = %path.display(), "loaded dictionary");
        }

        let fuzzy = self.config.fuzzy_flags();
        let nbest = self.config.nbest();
        engine.configure(nbest, fuzzy);
        tracing::info!(nbest, fuzzy = ?fuzzy, "conversion engine ready");

        Ok(Arc::new(engine))
    }

    /// Create a session for a new input context.
    pub fn create_session<S: PresentationSink>(
        &self,
        sink: S,
    ) -> anyhow::Result<Session<E::Context, S>> {
        let engine = self.engine()?;
        let context = E::new_context(engine);
        Ok(Session::new(context, sink, &self.config, self.registry()))
    }
}

impl<E> std::fmt::Debug for SessionHost<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHost")
            .field("config", &self.config)
            .field("initialized", &self.engine.get().is_some())
            .finish_non_exhaustive()
    }
}
