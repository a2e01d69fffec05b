use super::GatewayState;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn handle_admin(
    req: Request<Incoming>,
    state: GatewayState,
) -> Result<Response<BoxBody>, hyper::Error> {
    match req.uri().path() {
        "/health" | "/healthz" => Ok(Response::builder()
            .status(200)
            .body(full_body(r#"{"status":"ok"}"#))
            .unwrap()),

        "/ready" | "/readyz" => {
            let (routes, clusters) = state.snapshot_counts();
            Ok(Response::builder()
                .status(200)
                .body(full_body(format!(
                    r#"{{"status":"ready","routes":{},"clusters":{}}}"#,
                    routes, clusters,
                )))
                .unwrap())
        }

        "/metrics" => {
            let body = state.metrics.render();
            Ok(Response::builder()
                .status(200)
                .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
                .body(full_body(body))
                .unwrap())
        }

        "/snapshot" => {
            let snap = state.store.get();
            let routes: Vec<serde_json::Value> = snap
                .routes
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "routeId": r.route_id,
                        "clusterId": r.cluster_id,
                        "path": r.path_match,
                        "protocol": r.protocol,
                    })
                })
                .collect();
            let clusters: Vec<serde_json::Value> = snap
                .clusters
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "clusterId": c.cluster_id,
                        "serviceName": c.service_name,
                        "loadBalancingPolicy": c.load_balancing_policy,
                        "destinations": c.destinations.iter().map(|(id, d)| {
                            serde_json::json!({
                                "destinationId": id,
                                "address": d.address,
                                "weight": d.weight,
                                "protocol": d.protocol,
                            })
                        }).collect::<Vec<_>>(),
                    })
                })
                .collect();

            let body = serde_json::to_string_pretty(&serde_json::json!({
                "routes": routes,
                "clusters": clusters,
            }))
            .unwrap_or_default();
            Ok(Response::builder()
                .status(200)
                .header("content-type", "application/json")
                .body(full_body(body))
                .unwrap())
        }

        _ => Ok(Response::builder()
            .status(404)
            .body(full_body(r#"{"error":"not found"}"#))
            .unwrap()),
    }
}
