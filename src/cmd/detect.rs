use vidpeek::{detect, normalize_url};

/// Print `url<TAB>platform<TAB>link kind` per URL. Returns `false` if any URL
/// is unrecognized.
pub fn cmd_detect(urls: &[String]) -> bool {
    let mut all_known = true;

    for url in urls {
        let normalized = normalize_url(url);
        match detect(&normalized) {
            Some(platform) => {
                let kind = if platform.is_short_link(&normalized) {
                    "short-link"
                } else {
                    "page"
                };
                println!("{url}\t{platform}\t{kind}");
            }
            None => {
                all_known = false;
                println!("{url}\tunrecognized\t-");
            }
        }
    }

    all_known
}
