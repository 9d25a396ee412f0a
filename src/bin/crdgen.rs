//! Prints the AgentPool CustomResourceDefinition as YAML.
//!
//! ```bash
//! crdgen > config/crd/agentpool.yaml
//! ```

use agent_pool_controller::AgentPool;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&AgentPool::crd())?);
    Ok(())
}
