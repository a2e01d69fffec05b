use crate::proxy::context::{BoxBody, RequestContext};
use crate::server::GatewayState;
use http::header::{CONNECTION, HOST, TRANSFER_ENCODING};
use http::{HeaderName, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, Response, Uri};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::warn;

/// Handle an incoming HTTP request: match a route against the current
/// snapshot, pick a destination via round-robin, forward the request, and
/// record metrics. The reverse-proxy data plane proper is out of scope
/// (spec §1) — this is a minimal stand-in so the crate runs end-to-end.
pub async fn handle_request(
    req: Request<Incoming>,
    state: GatewayState,
    peer_addr: SocketAddr,
) -> Result<Response<BoxBody>, hyper::Error> {
    let host = req
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let uri_path = req.uri().path().to_string();
    let method = req.method().as_str().to_string();

    let client_ip = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|s| s.trim().parse::<std::net::IpAddr>().ok())
        .unwrap_or_else(|| peer_addr.ip());

    let mut ctx = RequestContext::new(host.clone(), uri_path.clone(), method, client_ip);

    let snapshot = state.store.get();
    state.routing.sync(&snapshot);
    state.clusters.sync(&snapshot);

    let route = match state.routing.table().match_path(&uri_path) {
        Some(r) => r,
        None => return Ok(ctx.error_response(StatusCode::NOT_FOUND, "no route matched")),
    };
    ctx.route_name = route.route_id.clone();

    metrics::gauge!(
        "gateway_http_requests_in_flight",
        "route" => ctx.route_name.clone(),
    )
    .increment(1.0);

    let cluster = match state.clusters.get(&route.cluster_id) {
        Some(c) => c,
        None => {
            metrics::gauge!(
                "gateway_http_requests_in_flight",
                "route" => ctx.route_name.clone(),
            )
            .decrement(1.0);
            return Ok(ctx.error_response(StatusCode::BAD_GATEWAY, "no cluster for route"));
        }
    };

    let destination = match cluster.lb.select() {
        Some(d) => d,
        None => {
            metrics::gauge!(
                "gateway_http_requests_in_flight",
                "route" => ctx.route_name.clone(),
            )
            .decrement(1.0);
            return Ok(ctx.error_response(StatusCode::SERVICE_UNAVAILABLE, "no upstream available"));
        }
    };
    ctx.upstream_addr = destination.address.clone();

    let (parts, body) = req.into_parts();
    let mut headers = parts.headers.clone();
    inject_forwarded_headers(&mut headers, peer_addr, &host);
    strip_hop_headers(&mut headers);

    let upstream_uri = match build_upstream_uri(&destination.address, parts.uri.path_and_query()) {
        Ok(u) => u,
        Err(_) => {
            metrics::gauge!(
                "gateway_http_requests_in_flight",
                "route" => ctx.route_name.clone(),
            )
            .decrement(1.0);
            return Ok(ctx.error_response(StatusCode::BAD_GATEWAY, "invalid upstream address"));
        }
    };

    let mut builder = Request::builder().method(parts.method.clone()).uri(upstream_uri);
    *builder.headers_mut().unwrap() = headers;
    let upstream_req = builder
        .body(body.boxed())
        .expect("request builder with cloned parts cannot fail");

    ctx.upstream_start = Some(Instant::now());
    let resp = state.clusters.http_client().request(upstream_req).await;

    match resp {
        Ok(resp) => {
            let (parts, body) = resp.into_parts();
            let status = parts.status.as_u16();
            ctx.finalize_metrics(status);
            Ok(Response::from_parts(parts, body.boxed()))
        }
        Err(e) => {
            warn!(error = %e, upstream = %ctx.upstream_addr, "upstream request failed");
            Ok(ctx.error_response(StatusCode::BAD_GATEWAY, "upstream request failed"))
        }
    }
}

fn build_upstream_uri(
    address: &str,
    path_and_query: Option<&http::uri::PathAndQuery>,
) -> Result<Uri, http::Error> {
    let base = address.trim_end_matches('/');
    let suffix = path_and_query.map(|p| p.as_str()).unwrap_or("/");
    format!("{}{}", base, suffix).parse::<Uri>().map_err(Into::into)
}

fn strip_hop_headers(headers: &mut http::HeaderMap) {
    headers.remove(CONNECTION);
    headers.remove(TRANSFER_ENCODING);
    headers.remove(HOST);
}

/// Appends standard `X-Forwarded-*` headers before forwarding upstream
/// (ambient reverse-proxy behavior, not a routing concern):
/// - `X-Forwarded-For`: append the TCP peer IP to any existing value.
/// - `X-Forwarded-Proto`: default to `http` when absent.
/// - `X-Forwarded-Host`: the original `Host` header value.
/// - `X-Real-IP`: always the immediate peer.
fn inject_forwarded_headers(headers: &mut http::HeaderMap, peer_addr: SocketAddr, original_host: &str) {
    static XFF: HeaderName = HeaderName::from_static("x-forwarded-for");
    static XFP: HeaderName = HeaderName::from_static("x-forwarded-proto");
    static XFH: HeaderName = HeaderName::from_static("x-forwarded-host");
    static XRI: HeaderName = HeaderName::from_static("x-real-ip");

    let peer_ip = peer_addr.ip().to_string();

    if let Some(existing) = headers.get(&XFF).and_then(|v| v.to_str().ok()) {
        let combined = format!("{existing}, {peer_ip}");
        if let Ok(v) = HeaderValue::from_str(&combined) {
            headers.insert(XFF.clone(), v);
        }
    } else if let Ok(v) = HeaderValue::from_str(&peer_ip) {
        headers.insert(XFF.clone(), v);
    }

    if !headers.contains_key(&XFP) {
        headers.insert(XFP.clone(), HeaderValue::from_static("http"));
    }

    if !original_host.is_empty() {
        if let Ok(v) = HeaderValue::from_str(original_host) {
            headers.insert(XFH.clone(), v);
        }
    }

    if let Ok(v) = HeaderValue::from_str(&peer_ip) {
        headers.insert(XRI.clone(), v);
    }
}
