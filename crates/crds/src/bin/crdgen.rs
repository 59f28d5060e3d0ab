//! Prints the SR-IOV FEC CRD manifests as a multi-document YAML stream.

use crds::{SriovFecClusterConfig, SriovFecNodeConfig};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [SriovFecClusterConfig::crd(), SriovFecNodeConfig::crd()];
    for crd in crds {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
