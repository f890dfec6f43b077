/// Hidden HTML marker identifying a bot comment, so reruns update it instead
/// of posting a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentMarker {
    marker: String,
}

impl CommentMarker {
    pub fn new(namespace: &str, tag: &str) -> Self {
        CommentMarker {
            marker: format!("<!-- gha-ci comment tag: {}/{} -->", namespace, tag),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.marker
    }

    pub fn is_in(&self, body: &str) -> bool {
        body.contains(&self.marker)
    }

    pub fn append_to(&self, body: &str) -> String {
        format!("{}\n\n{}", body, self.marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker() {
        let marker = CommentMarker::new("gha-ci", "changes");
        assert_eq!(marker.as_str(), "<!-- gha-ci comment tag: gha-ci/changes -->");
        let body = marker.append_to("hello");
        assert!(body.starts_with("hello\n\n"));
        assert!(marker.is_in(&body));
        assert!(!CommentMarker::new("gha-ci", "other").is_in(&body));
    }
}
