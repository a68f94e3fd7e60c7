//! Cluster API client
//!
//! The small slice of the Kubernetes API that scrape-patch talks to: listing
//! nodes and pods, and getting, creating and merge-patching services and
//! endpoints in a namespace.
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ClusterClientTrait, ConnectionOptions, KubeClusterClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // In-cluster service account, no overrides
//! let client = KubeClusterClient::connect(&ConnectionOptions::default()).await?;
//!
//! let nodes = client.list_nodes(Some(5)).await?;
//! println!("cluster has {} nodes", nodes.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{ConnectionOptions, KubeClusterClient, parse_apiserver_host};
pub use cluster_trait::ClusterClientTrait;
pub use error::ClusterError;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockClusterClient, MockOperation};
