// tests/feed_parse.rs
use ai_review_updater::sources::feed::parse_feed;

const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>New AI Tools</title>
    <item>
      <title>Writey AI</title>
      <link>https://writey.example</link>
      <description>An AI&nbsp;writing assistant</description>
    </item>
    <item>
      <link>https://no-title.example</link>
      <description>dropped: no title</description>
    </item>
    <item>
      <title>  Chartly   AI </title>
      <link> https://chartly.example </link>
    </item>
  </channel>
</rss>"#;

#[test]
fn items_are_normalized_and_incomplete_ones_dropped() {
    let items = parse_feed("futuretools", FIXTURE, 10).unwrap();
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].title, "Writey AI");
    assert_eq!(items[0].summary, "An AI writing assistant");
    assert_eq!(items[0].link, "https://writey.example");
    assert_eq!(items[0].source_id, "futuretools");

    assert_eq!(items[1].title, "Chartly AI");
    assert_eq!(items[1].link, "https://chartly.example");
    assert_eq!(items[1].summary, "");
}

#[test]
fn per_source_cap_takes_top_n_in_fetch_order() {
    let items = parse_feed("futuretools", FIXTURE, 1).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Writey AI");
}

#[test]
fn unparsable_feed_is_an_error() {
    assert!(parse_feed("bad", "<html>not a feed</html>", 10).is_err());
}

#[test]
fn empty_channel_yields_no_items() {
    let xml = r#"<rss version="2.0"><channel><title>empty</title></channel></rss>"#;
    let items = parse_feed("empty", xml, 10).unwrap();
    assert!(items.is_empty());
}
