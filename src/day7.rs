use crate::util::non_empty_lines;
use itertools::Itertools;
use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::{DfsPostOrder, EdgeRef},
};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    str::FromStr,
};
use thiserror::Error;
use tracing::{debug, info};

pub type Color = String;

pub const TARGET_COLOR: &str = "shiny gold";

#[derive(Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("empty rule")]
    EmptyRule,
    #[error("malformed rule: '{line}'")]
    MalformedRule { line: String },
    #[error("invalid bag count '{count}' in rule: '{line}'")]
    InvalidCount { count: String, line: String },
    #[error("no rule mentions the color '{0}'")]
    UnknownColor(Color),
    #[error("bag rules are cyclic through '{0}'")]
    CyclicRule(Color),
    #[error("bag count inside '{0}' overflows")]
    CountOverflow(Color),
}

#[derive(Clone, Eq, PartialEq)]
pub struct Rule {
    pub parent: Color,
    pub children: BTreeMap<Color, u32>,
}

/// Parse a rule like
/// `light red bags contain 1 bright white bag, 2 muted yellow bags.`
///
/// Tokens after the `<adj> <hue> bags contain` header are consumed in groups
/// of four (`<count> <adj> <hue> bag(s)`). A short tail, like the
/// `no other bags.` of an empty rule, is ignored.
pub fn parse_rule(line: &str) -> Result<Rule, Error> {
    let tokens = line.split_whitespace().collect::<Vec<_>>();
    if tokens.is_empty() {
        return Err(Error::EmptyRule);
    }

    let malformed = || Error::MalformedRule {
        line: line.to_owned(),
    };

    if tokens.len() < 4 {
        return Err(malformed());
    }
    let (header, contents) = tokens.split_at(4);

    let parent = match header {
        [adj, hue, "bags", "contain"] => format!("{} {}", adj, hue),
        _ => return Err(malformed()),
    };

    let mut children = BTreeMap::new();
    for (count, adj, hue, _bags) in contents.iter().copied().tuples() {
        let count = count.parse::<u32>().map_err(|_| Error::InvalidCount {
            count: count.to_owned(),
            line: line.to_owned(),
        })?;
        children.insert(format!("{} {}", adj, hue), count);
    }

    Ok(Rule { parent, children })
}

pub fn parse_rules(input: &str) -> Result<Vec<Rule>, Error> {
    non_empty_lines(input).map(parse_rule).collect()
}

impl FromStr for Rule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_rule(s)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => ", self.parent)?;
        let mut debug_list = f.debug_list();
        for (bag, num) in &self.children {
            debug_list.entry(&format!("{} {}", num, bag));
        }
        debug_list.finish()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// child color => colors that can directly hold it
#[derive(Debug, Default)]
pub struct InvertedIndex {
    parents: HashMap<Color, HashSet<Color>>,
}

impl InvertedIndex {
    pub fn from_rules(rules: &[Rule]) -> Self {
        let mut parents = HashMap::<Color, HashSet<Color>>::new();
        for rule in rules {
            for child in rule.children.keys() {
                parents
                    .entry(child.clone())
                    .or_default()
                    .insert(rule.parent.clone());
            }
        }
        Self { parents }
    }

    pub fn parents_of<'a>(&'a self, color: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.parents
            .get(color)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}

/// Every color that can hold `target`, directly or through other bags.
///
/// `target` itself only shows up if some cycle leads back to it.
pub fn find_container_colors<'a>(target: &str, index: &'a InvertedIndex) -> HashSet<&'a str> {
    let mut containers = HashSet::new();
    let mut stack = index.parents_of(target).collect::<Vec<_>>();

    while let Some(color) = stack.pop() {
        if containers.insert(color) {
            stack.extend(index.parents_of(color));
        }
    }

    containers
}

/// Containment graph: `parent -> child` edges weighted by the required count.
#[derive(Debug)]
pub struct RuleGraph {
    index_map: HashMap<Color, NodeIndex>,
    graph: DiGraph<Color, u32>,
}

fn node_for(
    graph: &mut DiGraph<Color, u32>,
    index_map: &mut HashMap<Color, NodeIndex>,
    color: &str,
) -> NodeIndex {
    if let Some(idx) = index_map.get(color) {
        return *idx;
    }
    let idx = graph.add_node(color.to_owned());
    index_map.insert(color.to_owned(), idx);
    idx
}

impl RuleGraph {
    pub fn from_rules(rules: &[Rule]) -> Self {
        // a later rule for the same color replaces the earlier one
        let by_parent = rules
            .iter()
            .map(|rule| (rule.parent.as_str(), rule))
            .collect::<HashMap<_, _>>();

        let mut graph = DiGraph::new();
        let mut index_map = HashMap::new();

        for rule in by_parent.values() {
            let parent_idx = node_for(&mut graph, &mut index_map, &rule.parent);
            for (child, num) in &rule.children {
                let child_idx = node_for(&mut graph, &mut index_map, child);
                graph.add_edge(parent_idx, child_idx, *num);
            }
        }

        Self { index_map, graph }
    }

    fn node(&self, color: &str) -> Option<NodeIndex> {
        self.index_map.get(color).copied()
    }
}

/// Number of bags inside one `target` bag, not counting `target` itself.
pub fn count_contained_bags(target: &str, rules: &RuleGraph) -> Result<u64, Error> {
    // contained_i = sum_{(i,j) in E} w_{i,j} * (1 + contained_j)

    let bag_idx = rules
        .node(target)
        .ok_or_else(|| Error::UnknownColor(target.to_owned()))?;
    let graph = &rules.graph;

    let mut contained: Vec<Option<u64>> = vec![None; graph.node_count()];
    let mut dfs = DfsPostOrder::new(graph, bag_idx);

    while let Some(node) = dfs.next(graph) {
        let mut sum = 0;
        for edge in graph.edges(node) {
            // post-order finishes every child first, unless it is still on
            // the dfs stack, i.e. we walked around a cycle
            let contained_j = contained[edge.target().index()]
                .ok_or_else(|| Error::CyclicRule(graph[edge.target()].clone()))?;
            let w_ij = u64::from(*edge.weight());
            sum = contained_j
                .checked_add(1)
                .and_then(|bags| bags.checked_mul(w_ij))
                .and_then(|bags| bags.checked_add(sum))
                .ok_or_else(|| Error::CountOverflow(graph[node].clone()))?;
        }
        contained[node.index()] = Some(sum);
    }

    Ok(contained[bag_idx.index()].unwrap_or(0))
}

#[derive(Debug, Eq, PartialEq)]
pub struct Day7Answer {
    pub top_level_colors: usize,
    pub bag_count: u64,
}

pub fn solve(input: &str) -> Result<Day7Answer, Error> {
    let rules = time!("parse rules", parse_rules(input)?);
    info!(rules = rules.len(), "parsed bag rules");

    let index = InvertedIndex::from_rules(&rules);
    let containers = time!(
        "find container colors",
        find_container_colors(TARGET_COLOR, &index)
    );
    debug!(?containers, "containers of {}", TARGET_COLOR);

    let graph = RuleGraph::from_rules(&rules);
    let bag_count = time!(
        "count contained bags",
        count_contained_bags(TARGET_COLOR, &graph)?
    );

    Ok(Day7Answer {
        top_level_colors: containers.len(),
        bag_count,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    const EXAMPLE: &str = "\
        light red bags contain 1 bright white bag, 2 muted yellow bags.\n\
        dark orange bags contain 3 bright white bags, 4 muted yellow bags.\n\
        bright white bags contain 1 shiny gold bag.\n\
        muted yellow bags contain 2 shiny gold bags, 9 faded blue bags.\n\
        shiny gold bags contain 1 dark olive bag, 2 vibrant plum bags.\n\
        dark olive bags contain 3 faded blue bags, 4 dotted black bags.\n\
        vibrant plum bags contain 5 faded blue bags, 6 dotted black bags.\n\
        faded blue bags contain no other bags.\n\
        dotted black bags contain no other bags.\n\
    ";

    const DEEP_EXAMPLE: &str = "\
        shiny gold bags contain 2 dark red bags.\n\
        dark red bags contain 2 dark orange bags.\n\
        dark orange bags contain 2 dark yellow bags.\n\
        dark yellow bags contain 2 dark green bags.\n\
        dark green bags contain 2 dark blue bags.\n\
        dark blue bags contain 2 dark violet bags.\n\
        dark violet bags contain no other bags.\n\
    ";

    fn rule(parent: &str, children: &[(&str, u32)]) -> Rule {
        Rule {
            parent: parent.to_owned(),
            children: children
                .iter()
                .map(|(color, num)| (color.to_string(), *num))
                .collect(),
        }
    }

    #[test]
    fn test_parse_rule() {
        assert_eq!(
            parse_rule("light red bags contain 1 bright white bag, 2 muted yellow bags.").unwrap(),
            rule("light red", &[("bright white", 1), ("muted yellow", 2)]),
        );
        assert_eq!(
            parse_rule("faded blue bags contain no other bags.").unwrap(),
            rule("faded blue", &[]),
        );
        assert_eq!(
            "bright  white bags\tcontain 1 shiny gold bag."
                .parse::<Rule>()
                .unwrap(),
            rule("bright white", &[("shiny gold", 1)]),
        );
    }

    #[test]
    fn test_parse_rule_errors() {
        assert_eq!(parse_rule(""), Err(Error::EmptyRule));
        assert_eq!(parse_rule("   "), Err(Error::EmptyRule));
        assert!(matches!(
            parse_rule("faded blue bags"),
            Err(Error::MalformedRule { .. })
        ));
        assert!(matches!(
            parse_rule("faded blue things contain no other bags."),
            Err(Error::MalformedRule { .. })
        ));
        assert_eq!(
            parse_rule("light red bags contain one bright white bag."),
            Err(Error::InvalidCount {
                count: "one".to_owned(),
                line: "light red bags contain one bright white bag.".to_owned(),
            })
        );
    }

    #[test]
    fn test_rule_display() {
        let rule = parse_rule(EXAMPLE.lines().next().unwrap()).unwrap();
        assert_eq!(
            rule.to_string(),
            r#"light red => ["1 bright white", "2 muted yellow"]"#
        );
    }

    #[test]
    fn test_inverted_index() {
        let rules = parse_rules(EXAMPLE).unwrap();
        let index = InvertedIndex::from_rules(&rules);

        let parents = index.parents_of("shiny gold").collect::<HashSet<_>>();
        let expected = ["bright white", "muted yellow"]
            .iter()
            .copied()
            .collect::<HashSet<_>>();
        assert_eq!(parents, expected);

        assert_eq!(index.parents_of("light red").count(), 0);
        assert_eq!(index.parents_of("no such color").count(), 0);
    }

    #[test]
    fn test_find_container_colors() {
        let rules = parse_rules(EXAMPLE).unwrap();
        let index = InvertedIndex::from_rules(&rules);

        let containers = find_container_colors("shiny gold", &index);
        let expected = ["bright white", "muted yellow", "dark orange", "light red"]
            .iter()
            .copied()
            .collect::<HashSet<_>>();
        assert_eq!(containers, expected);

        assert!(find_container_colors("light red", &index).is_empty());
        assert!(find_container_colors("no such color", &index).is_empty());
    }

    #[test]
    fn test_find_container_colors_cycle() {
        let rules = vec![
            rule("shiny gold", &[("dark red", 1)]),
            rule("dark red", &[("shiny gold", 1)]),
        ];
        let index = InvertedIndex::from_rules(&rules);

        let containers = find_container_colors("shiny gold", &index);
        let expected = ["dark red", "shiny gold"]
            .iter()
            .copied()
            .collect::<HashSet<_>>();
        assert_eq!(containers, expected);
    }

    #[test]
    fn test_count_contained_bags() {
        let graph = RuleGraph::from_rules(&parse_rules(EXAMPLE).unwrap());
        assert_eq!(count_contained_bags("shiny gold", &graph), Ok(32));
        assert_eq!(count_contained_bags("faded blue", &graph), Ok(0));
        assert_eq!(count_contained_bags("dark olive", &graph), Ok(7));

        let graph = RuleGraph::from_rules(&parse_rules(DEEP_EXAMPLE).unwrap());
        assert_eq!(count_contained_bags("shiny gold", &graph), Ok(126));
    }

    #[test]
    fn test_count_contained_bags_errors() {
        let graph = RuleGraph::from_rules(&parse_rules(EXAMPLE).unwrap());
        assert_eq!(
            count_contained_bags("plaid orange", &graph),
            Err(Error::UnknownColor("plaid orange".to_owned()))
        );

        let graph = RuleGraph::from_rules(&[
            rule("shiny gold", &[("dark red", 1)]),
            rule("dark red", &[("shiny gold", 1)]),
        ]);
        assert!(matches!(
            count_contained_bags("shiny gold", &graph),
            Err(Error::CyclicRule(_))
        ));

        let graph = RuleGraph::from_rules(&[rule("shiny gold", &[("shiny gold", 2)])]);
        assert_eq!(
            count_contained_bags("shiny gold", &graph),
            Err(Error::CyclicRule("shiny gold".to_owned()))
        );
    }

    #[test]
    fn test_count_contained_bags_overflow() {
        let input = "\
            shiny gold bags contain 4000000000 dark red bags.\n\
            dark red bags contain 4000000000 dark blue bags.\n\
            dark blue bags contain 4000000000 dark green bags.\n\
            dark green bags contain no other bags.\n\
        ";
        let graph = RuleGraph::from_rules(&parse_rules(input).unwrap());

        // 4e9 * (1 + 4e9) still fits, one more level does not
        assert_eq!(
            count_contained_bags("dark red", &graph),
            Ok(4_000_000_000 * 4_000_000_001)
        );
        assert_eq!(
            count_contained_bags("shiny gold", &graph),
            Err(Error::CountOverflow("shiny gold".to_owned()))
        );
        assert_eq!(
            solve(input),
            Err(Error::CountOverflow("shiny gold".to_owned()))
        );
    }

    #[test]
    fn test_count_contained_bags_shared_children() {
        // both paths to "faded blue" are counted, and a color with no rule of
        // its own holds nothing
        let graph = RuleGraph::from_rules(&[
            rule("shiny gold", &[("dark red", 2), ("muted yellow", 1)]),
            rule("dark red", &[("faded blue", 3)]),
            rule("muted yellow", &[("faded blue", 1), ("pale cyan", 4)]),
            rule("faded blue", &[]),
        ]);
        // 2 * (1 + 3) + 1 * (1 + 1 + 4)
        assert_eq!(count_contained_bags("shiny gold", &graph), Ok(14));
    }

    #[test]
    fn test_solve() {
        assert_eq!(
            solve(EXAMPLE),
            Ok(Day7Answer {
                top_level_colors: 4,
                bag_count: 32,
            })
        );
        assert_eq!(solve(""), Err(Error::UnknownColor(TARGET_COLOR.to_owned())));
    }
}
