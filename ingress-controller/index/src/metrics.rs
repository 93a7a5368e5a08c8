use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};

#[derive(Clone, Debug)]
pub struct ReconcileMetrics {
    reconciles: Family<KindLabels, Counter>,
    errors: Family<KindLabels, Counter>,
    published: Counter,
    store_size: Gauge,
    static_routes: Gauge,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct KindLabels {
    kind: &'static str,
}

// === impl ReconcileMetrics ===

impl ReconcileMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let reconciles = Family::<KindLabels, Counter>::default();
        reg.register(
            "reconciles",
            "Total number of reconciliations started",
            reconciles.clone(),
        );

        let errors = Family::<KindLabels, Counter>::default();
        reg.register(
            "reconcile_errors",
            "Total number of reconciliations that failed",
            errors.clone(),
        );

        let published = Counter::default();
        reg.register(
            "models_published",
            "Total number of graph models handed to the publisher",
            published.clone(),
        );

        let store_size = Gauge::default();
        reg.register(
            "model_store_size",
            "Number of graph models currently held",
            store_size.clone(),
        );

        let static_routes = Gauge::default();
        reg.register(
            "vrf_static_routes",
            "Number of static routes in the VRF context",
            static_routes.clone(),
        );

        Self {
            reconciles,
            errors,
            published,
            store_size,
            static_routes,
        }
    }

    pub(crate) fn reconcile_started(&self, kind: &'static str) {
        self.reconciles.get_or_create(&KindLabels { kind }).inc();
    }

    pub(crate) fn reconcile_failed(&self, kind: &'static str) {
        self.errors.get_or_create(&KindLabels { kind }).inc();
    }

    pub(crate) fn published(&self, n: usize) {
        self.published.inc_by(n as u64);
    }

    pub(crate) fn set_store_size(&self, n: usize) {
        self.store_size.set(n as i64);
    }

    pub(crate) fn set_static_routes(&self, n: usize) {
        self.static_routes.set(n as i64);
    }
}
