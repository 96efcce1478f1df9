use crate::domain::model::plant_model::Path;
use crate::domain::model::vehicle::Vehicle;

/// Pluggable cost function for one path traversal. The routing algorithm is
/// agnostic of what "cost" means; deployments inject their own evaluator.
pub trait EdgeEvaluator: Send + Sync {
    fn costs(&self, vehicle: &Vehicle, path: &Path) -> u64;
}

/// Default evaluator: a path costs its length.
pub struct EdgeEvaluatorByLength;

impl EdgeEvaluator for EdgeEvaluatorByLength {
    fn costs(&self, _vehicle: &Vehicle, path: &Path) -> u64 {
        path.length
    }
}
