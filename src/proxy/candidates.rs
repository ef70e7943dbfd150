//! Ordered cover sources for a request.
//!
//! NDS covers come from the art host, one URL per region:
//!
//! ```text
//! {art_base_url}/ds/cover/{REGION}/{CODE}.jpg
//! ```
//!
//! GBA covers come from the object store, probed per extension with and
//! without a `gba/` prefix:
//!
//! ```text
//! CODE.png  gba/CODE.png  CODE.jpg  gba/CODE.jpg  CODE.jpeg  gba/CODE.jpeg
//! ```
//!
//! Candidates are produced lazily; the proxy stops at the first hit.

use super::ProxyConfig;
use super::request::CoverRequest;
use crate::rom::Platform;

/// Default region order tried on the art host.
pub const REGIONS: [&str; 4] = ["EN", "US", "EU", "JA"];

/// Extensions probed in the object store, with their fallback MIME type.
pub const OBJECT_EXTENSIONS: [(&str, &str); 3] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
];

/// Object path prefixes, tried in order for each extension.
pub const OBJECT_PREFIXES: [&str; 2] = ["", "gba/"];

/// One place a cover might be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Fetch over HTTP.
    Upstream { region: String, url: String },
    /// Read from the object store.
    Object {
        path: String,
        content_type: &'static str,
    },
}

/// Path segment used by the art host.
pub fn art_path(platform: Platform) -> &'static str {
    match platform {
        Platform::Nds => "ds",
        Platform::Gba => "gba",
    }
}

/// Candidates for `request`, in priority order.
pub fn candidates<'a>(
    config: &'a ProxyConfig,
    request: &'a CoverRequest,
) -> Box<dyn Iterator<Item = Candidate> + Send + 'a> {
    match request.platform() {
        Platform::Nds => Box::new(upstream_candidates(config, request)),
        Platform::Gba => Box::new(object_candidates(request)),
    }
}

fn upstream_candidates<'a>(
    config: &'a ProxyConfig,
    request: &'a CoverRequest,
) -> impl Iterator<Item = Candidate> + Send + 'a {
    let base = config.art_base_url.trim_end_matches('/');
    let path = art_path(request.platform());
    config.regions.iter().map(move |region| Candidate::Upstream {
        region: region.clone(),
        url: format!("{}/{}/cover/{}/{}.jpg", base, path, region, request.code()),
    })
}

fn object_candidates(request: &CoverRequest) -> impl Iterator<Item = Candidate> + Send + '_ {
    OBJECT_EXTENSIONS
        .into_iter()
        .flat_map(move |(ext, content_type)| {
            OBJECT_PREFIXES.into_iter().map(move |prefix| Candidate::Object {
                path: format!("{}{}.{}", prefix, request.code(), ext),
                content_type,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nds_regions_in_order() {
        let config = ProxyConfig::default();
        let request = CoverRequest::new(Platform::Nds, "asme").unwrap();
        let urls: Vec<String> = candidates(&config, &request)
            .map(|c| match c {
                Candidate::Upstream { url, .. } => url,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://art.gametdb.com/ds/cover/EN/ASME.jpg",
                "https://art.gametdb.com/ds/cover/US/ASME.jpg",
                "https://art.gametdb.com/ds/cover/EU/ASME.jpg",
                "https://art.gametdb.com/ds/cover/JA/ASME.jpg",
            ]
        );
    }

    #[test]
    fn test_custom_base_and_regions() {
        let config = ProxyConfig {
            art_base_url: "http://localhost:9000/".to_string(),
            regions: vec!["JA".to_string()],
            ..ProxyConfig::default()
        };
        let request = CoverRequest::new(Platform::Nds, "YKWJ").unwrap();
        let all: Vec<Candidate> = candidates(&config, &request).collect();
        assert_eq!(
            all,
            vec![Candidate::Upstream {
                region: "JA".to_string(),
                url: "http://localhost:9000/ds/cover/JA/YKWJ.jpg".to_string(),
            }]
        );
    }

    #[test]
    fn test_gba_object_paths() {
        let config = ProxyConfig::default();
        let request = CoverRequest::new(Platform::Gba, "BPEE").unwrap();
        let paths: Vec<String> = candidates(&config, &request)
            .map(|c| match c {
                Candidate::Object { path, .. } => path,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            paths,
            vec![
                "BPEE.png",
                "gba/BPEE.png",
                "BPEE.jpg",
                "gba/BPEE.jpg",
                "BPEE.jpeg",
                "gba/BPEE.jpeg",
            ]
        );
    }

    #[test]
    fn test_candidates_are_lazy() {
        let config = ProxyConfig::default();
        let request = CoverRequest::new(Platform::Gba, "AXVE").unwrap();
        let first = candidates(&config, &request).next();
        assert_eq!(
            first,
            Some(Candidate::Object {
                path: "AXVE.png".to_string(),
                content_type: "image/png",
            })
        );
    }
}
