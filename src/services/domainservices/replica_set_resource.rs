use super::client::{DomainServicesClient, ReplicaSet};
use super::domain_service_resource::lock_name;
use super::ids::{DomainServiceId, DomainServiceReplicaSetId};
use crate::helpers::location;
use crate::provider::{import_as_exists_error, ProviderContext, Resource, Timeouts};
use crate::resourceids::{ResourceId, SubnetId};
use crate::schema::{validation, Attribute, Schema, ValueType};
use crate::state::ResourceData;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;

/// A replica set is an entry in its domain service's `replicaSets`, so every
/// change rewrites the parent under its lock
pub struct ActiveDirectoryDomainServiceReplicaSetResource;

#[async_trait]
impl Resource for ActiveDirectoryDomainServiceReplicaSetResource {
    fn type_name(&self) -> &'static str {
        "azurerm_active_directory_domain_service_replica_set"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attr(
                "domain_service_id",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validation::resource_id::<DomainServiceId>()),
            )
            .attr("location", location::schema())
            .attr(
                "subnet_id",
                Attribute::required(ValueType::String)
                    .force_new()
                    .validate(validation::resource_id::<SubnetId>()),
            )
            .attr(
                "domain_controller_ip_addresses",
                Attribute::computed(ValueType::List).elem_type(ValueType::String),
            )
            .attr("external_access_ip_address", Attribute::computed(ValueType::String))
            .attr("service_status", Attribute::computed(ValueType::String))
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(180, 5, 30, 60)
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        DomainServiceReplicaSetId::parse(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = DomainServicesClient::new(&ctx.client);
        let service_id = DomainServiceId::parse(data.require_str("domain_service_id")?)?;
        let subnet_id = data.require_str("subnet_id")?.to_string();

        let _lock = ctx.locks.lock(&lock_name(&service_id.domain_service_name)).await;

        let mut service = client
            .get(&service_id)
            .await
            .with_context(|| format!("retrieving {service_id}"))?;

        if let Some(existing) = service.properties.replica_sets.iter().find(|r| r.has_subnet(&subnet_id)) {
            let existing_id = service_id.replica_set(existing.replica_set_id.as_deref().unwrap_or_default());
            return Err(import_as_exists_error(self.type_name(), &existing_id.id()));
        }

        service.properties.replica_sets.push(ReplicaSet {
            location: Some(location::normalize(data.require_str("location")?)),
            subnet_id: Some(subnet_id.clone()),
            ..Default::default()
        });

        client
            .create_or_update(&service_id, &service)
            .await
            .with_context(|| format!("adding a replica set to {service_id}"))?;

        // the replica set ID is assigned by the API; find it by subnet
        let service = client
            .get(&service_id)
            .await
            .with_context(|| format!("retrieving {service_id}"))?;
        let Some(replica_set_id) = service
            .properties
            .replica_sets
            .iter()
            .find(|r| r.has_subnet(&subnet_id))
            .and_then(|r| r.replica_set_id.clone())
        else {
            bail!("determining the ID of the replica set added to {service_id} in subnet {subnet_id:?}");
        };

        let id = service_id.replica_set(&replica_set_id);
        data.set_id(id.id());

        client
            .wait_for(&service_id, "the new replica set", |s| {
                s.replica_set(&replica_set_id).is_some_and(ReplicaSet::is_ready)
            })
            .await
            .with_context(|| format!("waiting for {id} to become available"))?;

        Ok(())
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let client = DomainServicesClient::new(&ctx.client);
        let id = DomainServiceReplicaSetId::parse(data.id())?;
        let service_id = id.domain_service();

        let service = match client.get(&service_id).await {
            Ok(service) => service,
            Err(err) if err.was_not_found() => {
                tracing::debug!("{} was not found - removing {} from state", service_id, id);
                data.set_id("");
                return Ok(());
            }
            Err(err) => return Err(anyhow::Error::new(err).context(format!("retrieving {service_id}"))),
        };

        let Some(replica) = service.replica_set(&id.replica_set_id) else {
            tracing::debug!("{} was not found - removing from state", id);
            data.set_id("");
            return Ok(());
        };

        data.set("domain_service_id", service_id.id())?;
        data.set("location", location::normalize(replica.location.as_deref().unwrap_or_default()))?;
        data.set("subnet_id", &replica.subnet_id)?;
        data.set("domain_controller_ip_addresses", &replica.domain_controller_ip_address)?;
        data.set("external_access_ip_address", &replica.external_access_ip_address)?;
        data.set("service_status", &replica.service_status)?;

        Ok(())
    }

    async fn delete(&self, ctx: &ProviderContext, data: &ResourceData) -> Result<()> {
        let client = DomainServicesClient::new(&ctx.client);
        let id = DomainServiceReplicaSetId::parse(data.id())?;
        let service_id = id.domain_service();

        let _lock = ctx.locks.lock(&lock_name(&service_id.domain_service_name)).await;

        let mut service = match client.get(&service_id).await {
            Ok(service) => service,
            Err(err) if err.was_not_found() => return Ok(()),
            Err(err) => return Err(anyhow::Error::new(err).context(format!("retrieving {service_id}"))),
        };

        if service.replica_set(&id.replica_set_id).is_none() {
            return Ok(());
        }

        service.properties.replica_sets.retain(|r| {
            !r.replica_set_id
                .as_deref()
                .is_some_and(|rid| rid.eq_ignore_ascii_case(&id.replica_set_id))
        });
        if service.properties.replica_sets.is_empty() {
            bail!("deleting {id}: a domain service must keep at least one replica set");
        }

        client
            .create_or_update(&service_id, &service)
            .await
            .with_context(|| format!("removing {id}"))?;

        client
            .wait_for(&service_id, "replica set removal", |s| s.replica_set(&id.replica_set_id).is_none())
            .await
            .with_context(|| format!("waiting for {id} to be removed"))?;

        Ok(())
    }
}
