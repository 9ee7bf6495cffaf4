use kube::api::{DeleteParams, ListParams, Patch};
use kube::{Api, Client};
use tracing::debug;

use crate::core::client::kube_resources::Service;
use crate::core::client::apply_params;

/// Fetch services, either cluster-wide or from the given namespaces only
pub async fn fetch_services(
    client: &Client,
    namespaces: Option<&[String]>,
) -> kube::Result<Vec<Service>> {
    let Some(namespaces) = namespaces else {
        let services: Api<Service> = Api::all(client.clone());
        let svc_list = services.list(&ListParams::default()).await?;

        debug!("Discovered {} service(s)", svc_list.items.len());
        return Ok(svc_list.items);
    };

    let mut all = Vec::new();
    for ns in namespaces {
        let services: Api<Service> = Api::namespaced(client.clone(), ns);
        let svc_list = services.list(&ListParams::default()).await?;
        debug!("Discovered {} service(s) in namespace '{}'", svc_list.items.len(), ns);
        all.extend(svc_list.items);
    }
    Ok(all)
}

pub async fn apply_service(client: &Client, namespace: &str, service: &Service) -> kube::Result<Service> {
    let name = service.metadata.name.clone().unwrap_or_default();
    let services: Api<Service> = Api::namespaced(client.clone(), namespace);
    let applied = services
        .patch(&name, &apply_params(), &Patch::Apply(service))
        .await?;

    debug!("Applied service {}/{}", namespace, name);
    Ok(applied)
}

pub async fn delete_service(client: &Client, namespace: &str, name: &str) -> kube::Result<()> {
    let services: Api<Service> = Api::namespaced(client.clone(), namespace);
    services.delete(name, &DeleteParams::default()).await?;

    debug!("Deleted service {}/{}", namespace, name);
    Ok(())
}
